// DDL方言の抽象化
//
// スキーマゲートウェイが依存する外部コラボレーターのインターフェース。
// カラム型のレンダリングとテーブル・インデックス・キーのDDL実行、
// および生クエリ実行の能力を定義します。

use crate::core::config::Dialect;
use crate::core::error::MigrationError;
use async_trait::async_trait;
use std::collections::HashMap;

/// カラムのプロパティ記述子
///
/// マイグレーションユニットがスキーマゲートウェイに渡す宣言的な
/// カラム定義。`column_type`は方言非依存の論理型名です。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    /// 論理型名（text, integer, number, boolean, datetime, binary）
    pub column_type: String,
    /// NOT NULL制約を付与するか
    pub required: bool,
    /// 主キーカラムとして扱うか
    pub key: bool,
    /// カラム定義に追記する生SQL（外部キー句など）
    pub add_sql: Option<String>,
}

impl Property {
    /// 指定した論理型のプロパティを作成
    pub fn of(column_type: &str) -> Self {
        Self {
            column_type: column_type.to_string(),
            required: false,
            key: false,
            add_sql: None,
        }
    }

    /// NOT NULL制約を付与
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// 主キーカラムに指定
    pub fn key(mut self) -> Self {
        self.key = true;
        self
    }

    /// 追記SQLを設定
    pub fn with_add_sql(mut self, sql: &str) -> Self {
        self.add_sql = Some(sql.to_string());
        self
    }
}

/// 名前付きカラム定義
///
/// 定義順がそのままDDL内のカラム順になります。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    /// カラム名
    pub name: String,
    /// プロパティ
    pub property: Property,
}

impl ColumnDefinition {
    /// 新しいカラム定義を作成
    pub fn new(name: &str, property: Property) -> Self {
        Self {
            name: name.to_string(),
            property,
        }
    }
}

/// インデックス作成オプション
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexOptions {
    /// 対象テーブル名
    pub table: String,
    /// 対象カラム名のリスト
    pub columns: Vec<String>,
    /// ユニークインデックスかどうか
    pub unique: bool,
}

/// 外部キー作成オプション
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyOptions {
    /// 制約名
    pub name: String,
    /// 対象カラム名
    pub column: String,
    /// 参照先テーブル名
    pub references_table: String,
    /// 参照先カラム名
    pub references_column: String,
}

/// 生クエリ結果の1行（カラム名 -> 値）
pub type QueryRow = HashMap<String, serde_json::Value>;

/// DDL方言
///
/// スキーマ操作を具体的なSQL方言に翻訳して実行する外部コラボレーター。
/// すべての操作は失敗時に`MigrationError::Dialect`を返します。
#[async_trait]
pub trait DdlDialect: Send + Sync {
    /// 方言の種類を取得
    fn dialect(&self) -> Dialect;

    /// 識別子をクオート
    fn quote_ident(&self, ident: &str) -> String;

    /// プロパティの論理型を具体的なカラム型にレンダリング
    ///
    /// # Returns
    ///
    /// 解決できない型の場合はNone
    fn column_type(&self, property: &Property) -> Option<String>;

    /// テーブルを作成
    ///
    /// # Arguments
    ///
    /// * `collection` - テーブル名
    /// * `columns` - レンダリング済みカラム定義のリスト
    /// * `keys` - 主キーカラム名のリスト（空なら主キーなし）
    async fn create_collection(
        &self,
        collection: &str,
        columns: &[String],
        keys: &[String],
    ) -> Result<(), MigrationError>;

    /// テーブルを削除
    async fn drop_collection(&self, collection: &str) -> Result<(), MigrationError>;

    /// カラムを追加
    ///
    /// # Arguments
    ///
    /// * `column_sql` - レンダリング済みカラム定義
    async fn add_collection_column(
        &self,
        collection: &str,
        column_sql: &str,
    ) -> Result<(), MigrationError>;

    /// カラム名を変更
    async fn rename_collection_column(
        &self,
        collection: &str,
        old_name: &str,
        new_name: &str,
    ) -> Result<(), MigrationError>;

    /// カラムを削除
    async fn drop_collection_column(
        &self,
        collection: &str,
        column: &str,
    ) -> Result<(), MigrationError>;

    /// インデックスを作成
    async fn add_index(&self, name: &str, options: &IndexOptions) -> Result<(), MigrationError>;

    /// インデックスを削除
    async fn remove_index(&self, collection: &str, name: &str) -> Result<(), MigrationError>;

    /// 既存テーブルに主キーを追加
    async fn add_primary_key(&self, collection: &str, column: &str)
        -> Result<(), MigrationError>;

    /// 主キーを削除
    async fn drop_primary_key(
        &self,
        collection: &str,
        column: &str,
    ) -> Result<(), MigrationError>;

    /// 外部キーを追加
    async fn add_foreign_key(
        &self,
        collection: &str,
        options: &ForeignKeyOptions,
    ) -> Result<(), MigrationError>;

    /// 外部キーを削除
    async fn drop_foreign_key(&self, collection: &str, name: &str)
        -> Result<(), MigrationError>;

    /// テーブルの存在を確認
    async fn has_collection(&self, collection: &str) -> Result<bool, MigrationError>;

    /// テーブルのカラム名一覧を取得
    async fn collection_columns(&self, collection: &str) -> Result<Vec<String>, MigrationError>;

    /// 生クエリを実行して結果行を返す
    ///
    /// # Arguments
    ///
    /// * `sql` - 方言のプレースホルダー形式に従ったSQL
    /// * `params` - バインドパラメータ（すべて文字列として束縛）
    async fn exec_query(
        &self,
        sql: &str,
        params: &[String],
    ) -> Result<Vec<QueryRow>, MigrationError>;
}
