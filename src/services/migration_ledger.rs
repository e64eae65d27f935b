// マイグレーション台帳
//
// 適用済みマイグレーションの永続的な記録を所有するサービス。
// 台帳テーブルのライフサイクル管理と、レガシーv1レイアウト
// （マイグレーションごとに複数行）からv2レイアウト（1行）への
// 一回限りのスキーマアップグレードを担当します。

use crate::adapters::ddl_dialect::{ColumnDefinition, IndexOptions, Property, QueryRow};
use crate::core::config::{Dialect, Logger};
use crate::core::error::MigrationError;
use crate::core::migration::{Direction, LegacyMigrationRecord};
use crate::services::migration_dsl::MigrationDsl;
use std::sync::Arc;

/// 台帳テーブル名
pub const LEDGER_TABLE: &str = "orm_migrations";

/// 台帳のユニークインデックス名
pub const LEDGER_INDEX: &str = "unique_orm_migrations";

/// クエリ結果行から文字列値を取り出す
fn row_value_string(row: &QueryRow, key: &str) -> Option<String> {
    match row.get(key)? {
        serde_json::Value::String(value) => Some(value.clone()),
        serde_json::Value::Number(value) => Some(value.to_string()),
        _ => None,
    }
}

/// v1行のペアリング
///
/// `down`行はそれぞれ、同名で最初に見つかる`up`行と打ち消し合います。
/// 対応する`up`行が存在しない`down`行は単独で削除対象になります。
/// 残った行（取り消されていない純粋な`up`）が「現在適用済み」を表します。
///
/// # Arguments
///
/// * `rows` - `created_at`降順のv1行
///
/// # Returns
///
/// 厳密一致で削除すべき行のリスト
pub fn rows_to_delete(rows: &[LegacyMigrationRecord]) -> Vec<LegacyMigrationRecord> {
    let mut remaining: Vec<LegacyMigrationRecord> = rows.to_vec();
    let mut marked = Vec::new();

    let downs: Vec<LegacyMigrationRecord> = rows
        .iter()
        .filter(|row| row.direction == Direction::Down)
        .cloned()
        .collect();

    for down in downs {
        marked.push(down.clone());
        let matching_up = remaining
            .iter()
            .position(|row| row.direction == Direction::Up && row.migration == down.migration);
        if let Some(index) = matching_up {
            marked.push(remaining.remove(index));
        }
    }

    marked
}

/// マイグレーション台帳サービス
pub struct MigrationLedger {
    dsl: Arc<MigrationDsl>,
    logger: Logger,
}

impl MigrationLedger {
    /// 新しい台帳サービスを作成
    pub fn new(dsl: Arc<MigrationDsl>, logger: Logger) -> Self {
        Self { dsl, logger }
    }

    // ----- SQL生成（実行と分離、単体テスト対象）

    /// 最終適用マイグレーション取得SQLを生成
    pub fn generate_last_sql(&self) -> String {
        format!(
            "SELECT migration FROM {} ORDER BY migration DESC LIMIT 1",
            LEDGER_TABLE
        )
    }

    /// 全適用マイグレーション取得SQLを生成
    pub fn generate_all_sql(&self) -> String {
        format!(
            "SELECT migration FROM {} ORDER BY migration DESC",
            LEDGER_TABLE
        )
    }

    /// v1全行取得SQLを生成
    pub fn generate_all_v1_sql(&self) -> String {
        format!(
            "SELECT migration, direction, created_at FROM {} ORDER BY created_at DESC",
            LEDGER_TABLE
        )
    }

    /// 適用記録クエリを生成
    ///
    /// # Returns
    ///
    /// (SQL, バインドパラメータ)
    pub fn generate_save_query(&self, name: &str, dialect: Dialect) -> (String, Vec<String>) {
        (
            format!(
                "INSERT INTO {} (migration) VALUES ({})",
                LEDGER_TABLE,
                dialect.placeholder(1)
            ),
            vec![name.to_string()],
        )
    }

    /// 前方一致削除クエリを生成
    ///
    /// 台帳は拡張子付きのファイル名を保持するため、ステムの
    /// 前方一致（LIKE）で削除します。
    pub fn generate_delete_query(&self, stem: &str, dialect: Dialect) -> (String, Vec<String>) {
        (
            format!(
                "DELETE FROM {} WHERE migration LIKE {}",
                LEDGER_TABLE,
                dialect.placeholder(1)
            ),
            vec![format!("{}%", stem)],
        )
    }

    /// v1行の厳密一致削除クエリを生成
    pub fn generate_delete_v1_query(
        &self,
        record: &LegacyMigrationRecord,
        dialect: Dialect,
    ) -> (String, Vec<String>) {
        (
            format!(
                "DELETE FROM {} WHERE migration = {} AND created_at = {}",
                LEDGER_TABLE,
                dialect.placeholder(1),
                dialect.placeholder(2)
            ),
            vec![record.migration.clone(), record.created_at.clone()],
        )
    }

    // ----- 読み取り操作

    /// 辞書順で最大の適用済みマイグレーション名を取得
    ///
    /// # Returns
    ///
    /// 1件も適用されていない場合はNone
    pub async fn last_applied(&self) -> Result<Option<String>, MigrationError> {
        let sql = self.generate_last_sql();
        let rows = self
            .dsl
            .exec_query(&sql, &[])
            .await
            .map_err(|e| MigrationError::Read {
                message: "failed to read last applied migration".to_string(),
                cause: e.to_string(),
            })?;

        Ok(rows
            .first()
            .and_then(|row| row_value_string(row, "migration")))
    }

    /// すべての適用済みマイグレーション名を取得
    ///
    /// 適用時刻に関する順序は保証されません（集合としてのみ扱うこと）。
    pub async fn all_applied(&self) -> Result<Vec<String>, MigrationError> {
        let sql = self.generate_all_sql();
        let rows = self
            .dsl
            .exec_query(&sql, &[])
            .await
            .map_err(|e| MigrationError::Read {
                message: "failed to read applied migrations".to_string(),
                cause: e.to_string(),
            })?;

        Ok(rows
            .iter()
            .filter_map(|row| row_value_string(row, "migration"))
            .collect())
    }

    /// レガシーv1の全行を`created_at`降順で取得
    pub async fn all_v1(&self) -> Result<Vec<LegacyMigrationRecord>, MigrationError> {
        let sql = self.generate_all_v1_sql();
        let rows = self
            .dsl
            .exec_query(&sql, &[])
            .await
            .map_err(|e| MigrationError::Read {
                message: "failed to read legacy migration rows".to_string(),
                cause: e.to_string(),
            })?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            let migration =
                row_value_string(row, "migration").ok_or_else(|| MigrationError::Read {
                    message: "legacy row is missing the migration column".to_string(),
                    cause: format!("{:?}", row),
                })?;
            let direction_raw =
                row_value_string(row, "direction").ok_or_else(|| MigrationError::Read {
                    message: "legacy row is missing the direction column".to_string(),
                    cause: format!("{:?}", row),
                })?;
            let direction =
                Direction::parse(&direction_raw).ok_or_else(|| MigrationError::Read {
                    message: format!("invalid direction value '{}'", direction_raw),
                    cause: migration.clone(),
                })?;
            let created_at =
                row_value_string(row, "created_at").ok_or_else(|| MigrationError::Read {
                    message: "legacy row is missing the created_at column".to_string(),
                    cause: format!("{:?}", row),
                })?;

            records.push(LegacyMigrationRecord {
                migration,
                direction,
                created_at,
            });
        }
        Ok(records)
    }

    // ----- 書き込み操作

    /// 適用済みマイグレーションを記録
    pub async fn record_applied(&self, name: &str) -> Result<(), MigrationError> {
        let (sql, params) = self.generate_save_query(name, self.dsl.dialect());
        self.dsl
            .exec_query(&sql, &params)
            .await
            .map(|_| ())
            .map_err(|e| MigrationError::Write {
                message: format!("failed to record applied migration '{}'", name),
                cause: e.to_string(),
            })
    }

    /// 適用済みマイグレーションを削除
    ///
    /// ステムに前方一致するすべての行を削除します。0行削除は
    /// エラーではありません。
    pub async fn remove_applied(&self, stem: &str) -> Result<(), MigrationError> {
        let (sql, params) = self.generate_delete_query(stem, self.dsl.dialect());
        self.dsl
            .exec_query(&sql, &params)
            .await
            .map(|_| ())
            .map_err(|e| MigrationError::Write {
                message: format!("failed to remove applied migration '{}'", stem),
                cause: e.to_string(),
            })
    }

    // ----- テーブルライフサイクル

    /// 台帳スキーマを保証
    ///
    /// 3状態の判定を行います:
    /// 1. テーブルなし -> 作成してユニークインデックスを張る
    /// 2. カラム1つ -> v2なので何もしない
    /// 3. カラム複数 -> v1なのでアップグレードを実行
    pub async fn ensure_schema(&self) -> Result<(), MigrationError> {
        if self.dsl.has_table(LEDGER_TABLE).await? {
            let columns = self.dsl.get_columns(LEDGER_TABLE).await?;
            if columns.len() > 1 {
                // v1 ( multi columns ) -> migrate to v2
                (self.logger)("init", "Migrations table is v1, changing to v2");
                self.migrate_data().await?;
                self.update_table().await?;
                self.create_index().await?;
            }
            Ok(())
        } else {
            // no migrations table -> create it
            (self.logger)("init", "No migrations table, creating one");
            self.create_table().await?;
            self.create_index().await
        }
    }

    /// 台帳テーブルを作成
    async fn create_table(&self) -> Result<(), MigrationError> {
        let columns = vec![ColumnDefinition::new(
            "migration",
            Property::of("text").required(),
        )];
        self.dsl.create_table(LEDGER_TABLE, &columns).await
    }

    /// ユニークインデックスを作成
    async fn create_index(&self) -> Result<(), MigrationError> {
        let options = IndexOptions {
            table: LEDGER_TABLE.to_string(),
            columns: vec!["migration".to_string()],
            unique: true,
        };
        self.dsl.add_index(LEDGER_INDEX, &options).await
    }

    /// v1データをv2相当に移行
    ///
    /// down/upのペアを打ち消して1行ずつ厳密一致で削除します。
    /// 最初のエラーで停止し、部分的な失敗は修復されません。
    async fn migrate_data(&self) -> Result<(), MigrationError> {
        let rows = self.all_v1().await.map_err(|e| MigrationError::SchemaUpgrade {
            message: "failed to load legacy rows".to_string(),
            cause: e.to_string(),
        })?;

        for record in rows_to_delete(&rows) {
            let (sql, params) = self.generate_delete_v1_query(&record, self.dsl.dialect());
            self.dsl
                .exec_query(&sql, &params)
                .await
                .map_err(|e| MigrationError::SchemaUpgrade {
                    message: format!(
                        "failed to delete legacy row '{}' at '{}'",
                        record.migration, record.created_at
                    ),
                    cause: e.to_string(),
                })?;
        }
        Ok(())
    }

    /// レガシーカラムを削除してv2レイアウトにする
    async fn update_table(&self) -> Result<(), MigrationError> {
        for column in ["direction", "created_at"] {
            self.dsl
                .drop_column(LEDGER_TABLE, column)
                .await
                .map_err(|e| MigrationError::SchemaUpgrade {
                    message: format!("failed to drop legacy column '{}'", column),
                    cause: e.to_string(),
                })?;
        }
        Ok(())
    }
}
