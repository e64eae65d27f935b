// スキーマゲートウェイ
//
// スキーマ操作の動詞（テーブル作成、カラム追加、インデックス追加など）を
// DDL方言の呼び出しに翻訳する薄いファサード。マイグレーションユニットの
// 実行コンテキストとして渡されます。

use crate::adapters::ddl_dialect::{
    ColumnDefinition, DdlDialect, ForeignKeyOptions, IndexOptions, QueryRow,
};
use crate::core::config::Dialect;
use crate::core::error::MigrationError;
use std::sync::Arc;

/// スキーマゲートウェイ
///
/// すべての操作はDDL方言に委譲され、方言のエラーはそのまま
/// 呼び出し元に伝播されます。
pub struct MigrationDsl {
    dialect: Arc<dyn DdlDialect>,
}

impl MigrationDsl {
    /// 新しいスキーマゲートウェイを作成
    pub fn new(dialect: Arc<dyn DdlDialect>) -> Self {
        Self { dialect }
    }

    /// 方言の種類を取得
    pub fn dialect(&self) -> Dialect {
        self.dialect.dialect()
    }

    /// カラム定義をレンダリング
    ///
    /// 型解決はDDL方言の呼び出し前にローカルで行い、解決できない場合は
    /// そのカラム名を持つ`UnknownType`で失敗します。
    ///
    /// # Returns
    ///
    /// `quoted-name type [NOT NULL] [add_sql]` 形式の文字列
    pub fn create_column(
        &self,
        collection: &str,
        definition: &ColumnDefinition,
    ) -> Result<String, MigrationError> {
        let column_type = self.dialect.column_type(&definition.property).ok_or_else(|| {
            MigrationError::UnknownType {
                collection: collection.to_string(),
                column: definition.name.clone(),
            }
        })?;

        let mut rendered = format!(
            "{} {}",
            self.dialect.quote_ident(&definition.name),
            column_type
        );
        if definition.property.required {
            rendered.push_str(" NOT NULL");
        }
        if let Some(add_sql) = &definition.property.add_sql {
            rendered.push(' ');
            rendered.push_str(add_sql);
        }
        Ok(rendered)
    }

    /// テーブルを作成
    ///
    /// 各カラムの型をカラム単位で解決してからDDL方言を呼び出します。
    /// 最初に解決できなかったカラムの名前がエラーに含まれます。
    pub async fn create_table(
        &self,
        collection: &str,
        columns: &[ColumnDefinition],
    ) -> Result<(), MigrationError> {
        let mut rendered = Vec::with_capacity(columns.len());
        let mut keys = Vec::new();

        for definition in columns {
            let column = self.create_column(collection, definition)?;
            if definition.property.key {
                keys.push(definition.name.clone());
            }
            rendered.push(column);
        }

        self.dialect
            .create_collection(collection, &rendered, &keys)
            .await
    }

    /// テーブルを削除
    pub async fn drop_table(&self, collection: &str) -> Result<(), MigrationError> {
        self.dialect.drop_collection(collection).await
    }

    /// カラムを追加
    pub async fn add_column(
        &self,
        collection: &str,
        definition: &ColumnDefinition,
    ) -> Result<(), MigrationError> {
        let column = self.create_column(collection, definition)?;
        self.dialect.add_collection_column(collection, &column).await
    }

    /// カラム名を変更
    pub async fn rename_column(
        &self,
        collection: &str,
        old_name: &str,
        new_name: &str,
    ) -> Result<(), MigrationError> {
        self.dialect
            .rename_collection_column(collection, old_name, new_name)
            .await
    }

    /// カラムを削除
    pub async fn drop_column(
        &self,
        collection: &str,
        column: &str,
    ) -> Result<(), MigrationError> {
        self.dialect.drop_collection_column(collection, column).await
    }

    /// インデックスを作成
    pub async fn add_index(
        &self,
        name: &str,
        options: &IndexOptions,
    ) -> Result<(), MigrationError> {
        self.dialect.add_index(name, options).await
    }

    /// インデックスを削除
    pub async fn drop_index(&self, collection: &str, name: &str) -> Result<(), MigrationError> {
        self.dialect.remove_index(collection, name).await
    }

    /// 既存テーブルに主キーを追加
    pub async fn add_primary_key(
        &self,
        collection: &str,
        column: &str,
    ) -> Result<(), MigrationError> {
        self.dialect.add_primary_key(collection, column).await
    }

    /// 主キーを削除
    pub async fn drop_primary_key(
        &self,
        collection: &str,
        column: &str,
    ) -> Result<(), MigrationError> {
        self.dialect.drop_primary_key(collection, column).await
    }

    /// 外部キーを追加
    pub async fn add_foreign_key(
        &self,
        collection: &str,
        options: &ForeignKeyOptions,
    ) -> Result<(), MigrationError> {
        self.dialect.add_foreign_key(collection, options).await
    }

    /// 外部キーを削除
    pub async fn drop_foreign_key(
        &self,
        collection: &str,
        name: &str,
    ) -> Result<(), MigrationError> {
        self.dialect.drop_foreign_key(collection, name).await
    }

    /// テーブルの存在を確認
    pub async fn has_table(&self, collection: &str) -> Result<bool, MigrationError> {
        self.dialect.has_collection(collection).await
    }

    /// テーブルのカラム名一覧を取得
    pub async fn get_columns(&self, collection: &str) -> Result<Vec<String>, MigrationError> {
        self.dialect.collection_columns(collection).await
    }

    /// 生クエリを実行
    pub async fn exec_query(
        &self,
        sql: &str,
        params: &[String],
    ) -> Result<Vec<QueryRow>, MigrationError> {
        self.dialect.exec_query(sql, params).await
    }
}
