// SQLx DDL方言アダプター
//
// SQLxのAnyPoolを使用してPostgreSQL、MySQL、SQLiteの3方言に対応した
// DdlDialect実装を提供します。SQL生成と実行を分離し、SQL生成は
// データベースなしでテスト可能です。

use crate::adapters::ddl_dialect::{
    DdlDialect, ForeignKeyOptions, IndexOptions, Property, QueryRow,
};
use crate::core::config::Dialect;
use crate::core::error::MigrationError;
use async_trait::async_trait;
use sqlx::any::{AnyPoolOptions, AnyRow};
use sqlx::{AnyPool, Column, Row};
use std::time::Duration;

/// 文字列リテラルをエスケープ
fn escape_string(value: &str) -> String {
    value.replace('\'', "''")
}

/// SQLx DDL方言アダプター
///
/// 接続プールと方言の組み合わせでスキーマ操作を実行します。
#[derive(Debug, Clone)]
pub struct SqlxDdlDialect {
    pool: AnyPool,
    dialect: Dialect,
}

impl SqlxDdlDialect {
    /// 既存の接続プールからアダプターを作成
    pub fn new(pool: AnyPool, dialect: Dialect) -> Self {
        Self { pool, dialect }
    }

    /// 接続文字列からアダプターを作成
    ///
    /// # Arguments
    ///
    /// * `dialect` - データベース方言
    /// * `url` - 接続文字列（例: `sqlite:///path/to.db`）
    ///
    /// # Returns
    ///
    /// アダプターまたは接続エラー
    pub async fn connect(dialect: Dialect, url: &str) -> Result<Self, MigrationError> {
        sqlx::any::install_default_drivers();

        let pool = AnyPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(30))
            .connect(url)
            .await
            .map_err(|e| MigrationError::Dialect {
                operation: "connect".to_string(),
                cause: e.to_string(),
            })?;

        Ok(Self::new(pool, dialect))
    }

    /// 接続プールを取得
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    /// DDL文を実行
    async fn run(&self, operation: &str, sql: &str) -> Result<(), MigrationError> {
        sqlx::query(sql)
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| MigrationError::Dialect {
                operation: operation.to_string(),
                cause: e.to_string(),
            })
    }

    // ----- SQL生成（実行と分離、単体テスト対象）

    /// CREATE TABLE文を生成
    pub fn generate_create_collection_sql(
        &self,
        collection: &str,
        columns: &[String],
        keys: &[String],
    ) -> String {
        let mut definitions: Vec<String> = columns.to_vec();
        if !keys.is_empty() {
            let quoted: Vec<String> = keys.iter().map(|k| self.quote_ident(k)).collect();
            definitions.push(format!("PRIMARY KEY ({})", quoted.join(", ")));
        }
        format!(
            "CREATE TABLE {} ({})",
            self.quote_ident(collection),
            definitions.join(", ")
        )
    }

    /// DROP TABLE文を生成
    pub fn generate_drop_collection_sql(&self, collection: &str) -> String {
        format!("DROP TABLE {}", self.quote_ident(collection))
    }

    /// ADD COLUMN文を生成
    pub fn generate_add_column_sql(&self, collection: &str, column_sql: &str) -> String {
        format!(
            "ALTER TABLE {} ADD COLUMN {}",
            self.quote_ident(collection),
            column_sql
        )
    }

    /// RENAME COLUMN文を生成
    pub fn generate_rename_column_sql(
        &self,
        collection: &str,
        old_name: &str,
        new_name: &str,
    ) -> String {
        format!(
            "ALTER TABLE {} RENAME COLUMN {} TO {}",
            self.quote_ident(collection),
            self.quote_ident(old_name),
            self.quote_ident(new_name)
        )
    }

    /// DROP COLUMN文を生成
    pub fn generate_drop_column_sql(&self, collection: &str, column: &str) -> String {
        format!(
            "ALTER TABLE {} DROP COLUMN {}",
            self.quote_ident(collection),
            self.quote_ident(column)
        )
    }

    /// CREATE INDEX文を生成
    pub fn generate_add_index_sql(&self, name: &str, options: &IndexOptions) -> String {
        let unique = if options.unique { "UNIQUE " } else { "" };
        let columns: Vec<String> = options
            .columns
            .iter()
            .map(|c| self.quote_ident(c))
            .collect();
        format!(
            "CREATE {}INDEX {} ON {} ({})",
            unique,
            self.quote_ident(name),
            self.quote_ident(&options.table),
            columns.join(", ")
        )
    }

    /// DROP INDEX文を生成
    pub fn generate_remove_index_sql(&self, collection: &str, name: &str) -> String {
        match self.dialect {
            // MySQLはインデックスがテーブルに属する
            Dialect::MySQL => format!(
                "DROP INDEX {} ON {}",
                self.quote_ident(name),
                self.quote_ident(collection)
            ),
            Dialect::PostgreSQL | Dialect::SQLite => {
                format!("DROP INDEX {}", self.quote_ident(name))
            }
        }
    }

    /// 主キー追加文を生成
    ///
    /// SQLiteは既存テーブルへの主キー追加をサポートしないためエラー
    pub fn generate_add_primary_key_sql(
        &self,
        collection: &str,
        column: &str,
    ) -> Result<String, MigrationError> {
        match self.dialect {
            Dialect::PostgreSQL | Dialect::MySQL => Ok(format!(
                "ALTER TABLE {} ADD PRIMARY KEY ({})",
                self.quote_ident(collection),
                self.quote_ident(column)
            )),
            Dialect::SQLite => Err(MigrationError::Dialect {
                operation: "add_primary_key".to_string(),
                cause: "SQLite does not support adding a primary key to an existing table"
                    .to_string(),
            }),
        }
    }

    /// 主キー削除文を生成
    pub fn generate_drop_primary_key_sql(
        &self,
        collection: &str,
        _column: &str,
    ) -> Result<String, MigrationError> {
        match self.dialect {
            // PostgreSQLは規約名 <table>_pkey の制約を削除する
            Dialect::PostgreSQL => Ok(format!(
                "ALTER TABLE {} DROP CONSTRAINT {}",
                self.quote_ident(collection),
                self.quote_ident(&format!("{}_pkey", collection))
            )),
            Dialect::MySQL => Ok(format!(
                "ALTER TABLE {} DROP PRIMARY KEY",
                self.quote_ident(collection)
            )),
            Dialect::SQLite => Err(MigrationError::Dialect {
                operation: "drop_primary_key".to_string(),
                cause: "SQLite does not support dropping a primary key".to_string(),
            }),
        }
    }

    /// 外部キー追加文を生成
    pub fn generate_add_foreign_key_sql(
        &self,
        collection: &str,
        options: &ForeignKeyOptions,
    ) -> Result<String, MigrationError> {
        match self.dialect {
            Dialect::PostgreSQL | Dialect::MySQL => Ok(format!(
                "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
                self.quote_ident(collection),
                self.quote_ident(&options.name),
                self.quote_ident(&options.column),
                self.quote_ident(&options.references_table),
                self.quote_ident(&options.references_column)
            )),
            Dialect::SQLite => Err(MigrationError::Dialect {
                operation: "add_foreign_key".to_string(),
                cause: "SQLite does not support adding a foreign key to an existing table"
                    .to_string(),
            }),
        }
    }

    /// 外部キー削除文を生成
    pub fn generate_drop_foreign_key_sql(
        &self,
        collection: &str,
        name: &str,
    ) -> Result<String, MigrationError> {
        match self.dialect {
            Dialect::PostgreSQL => Ok(format!(
                "ALTER TABLE {} DROP CONSTRAINT {}",
                self.quote_ident(collection),
                self.quote_ident(name)
            )),
            Dialect::MySQL => Ok(format!(
                "ALTER TABLE {} DROP FOREIGN KEY {}",
                self.quote_ident(collection),
                self.quote_ident(name)
            )),
            Dialect::SQLite => Err(MigrationError::Dialect {
                operation: "drop_foreign_key".to_string(),
                cause: "SQLite does not support dropping a foreign key".to_string(),
            }),
        }
    }

    /// テーブル存在確認文を生成
    pub fn generate_has_collection_sql(&self, collection: &str) -> String {
        match self.dialect {
            Dialect::PostgreSQL | Dialect::MySQL => format!(
                "SELECT table_name FROM information_schema.tables WHERE table_name = '{}'",
                escape_string(collection)
            ),
            Dialect::SQLite => format!(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = '{}'",
                escape_string(collection)
            ),
        }
    }

    /// カラム一覧取得文を生成
    pub fn generate_collection_columns_sql(&self, collection: &str) -> String {
        match self.dialect {
            Dialect::PostgreSQL | Dialect::MySQL => format!(
                "SELECT column_name FROM information_schema.columns WHERE table_name = '{}'",
                escape_string(collection)
            ),
            Dialect::SQLite => format!(
                "SELECT name FROM pragma_table_info('{}')",
                escape_string(collection)
            ),
        }
    }
}

/// 論理型を方言固有のカラム型にマッピング
///
/// # Returns
///
/// 解決できない型の場合はNone
pub fn map_column_type(dialect: Dialect, column_type: &str) -> Option<String> {
    let mapped = match (dialect, column_type.to_lowercase().as_str()) {
        (_, "text") => "TEXT",

        (Dialect::MySQL, "integer") => "INT",
        (_, "integer") => "INTEGER",

        (Dialect::PostgreSQL, "number") => "DOUBLE PRECISION",
        (Dialect::MySQL, "number") => "DOUBLE",
        (Dialect::SQLite, "number") => "REAL",

        (Dialect::PostgreSQL, "boolean") => "BOOLEAN",
        (Dialect::MySQL, "boolean") => "TINYINT(1)",
        // SQLiteにはBOOLEAN型がないため、INTEGER (0/1)で表現
        (Dialect::SQLite, "boolean") => "INTEGER",

        (Dialect::PostgreSQL, "datetime") => "TIMESTAMP WITH TIME ZONE",
        (Dialect::MySQL, "datetime") => "DATETIME",
        // SQLiteではISO 8601形式のTEXTを使用
        (Dialect::SQLite, "datetime") => "TEXT",

        (Dialect::PostgreSQL, "binary") => "BYTEA",
        (Dialect::MySQL | Dialect::SQLite, "binary") => "BLOB",

        _ => return None,
    };
    Some(mapped.to_string())
}

/// AnyRowをカラム名 -> JSON値のマップに変換
fn row_to_map(row: &AnyRow) -> QueryRow {
    let mut map = QueryRow::new();
    for (index, column) in row.columns().iter().enumerate() {
        let value = if let Ok(v) = row.try_get::<i64, _>(index) {
            serde_json::Value::from(v)
        } else if let Ok(v) = row.try_get::<f64, _>(index) {
            serde_json::Value::from(v)
        } else if let Ok(v) = row.try_get::<bool, _>(index) {
            serde_json::Value::from(v)
        } else if let Ok(v) = row.try_get::<String, _>(index) {
            serde_json::Value::from(v)
        } else {
            serde_json::Value::Null
        };
        map.insert(column.name().to_string(), value);
    }
    map
}

#[async_trait]
impl DdlDialect for SqlxDdlDialect {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn quote_ident(&self, ident: &str) -> String {
        match self.dialect {
            Dialect::MySQL => format!("`{}`", ident.replace('`', "``")),
            Dialect::PostgreSQL | Dialect::SQLite => {
                format!("\"{}\"", ident.replace('"', "\"\""))
            }
        }
    }

    fn column_type(&self, property: &Property) -> Option<String> {
        map_column_type(self.dialect, &property.column_type)
    }

    async fn create_collection(
        &self,
        collection: &str,
        columns: &[String],
        keys: &[String],
    ) -> Result<(), MigrationError> {
        let sql = self.generate_create_collection_sql(collection, columns, keys);
        self.run("create_table", &sql).await
    }

    async fn drop_collection(&self, collection: &str) -> Result<(), MigrationError> {
        let sql = self.generate_drop_collection_sql(collection);
        self.run("drop_table", &sql).await
    }

    async fn add_collection_column(
        &self,
        collection: &str,
        column_sql: &str,
    ) -> Result<(), MigrationError> {
        let sql = self.generate_add_column_sql(collection, column_sql);
        self.run("add_column", &sql).await
    }

    async fn rename_collection_column(
        &self,
        collection: &str,
        old_name: &str,
        new_name: &str,
    ) -> Result<(), MigrationError> {
        let sql = self.generate_rename_column_sql(collection, old_name, new_name);
        self.run("rename_column", &sql).await
    }

    async fn drop_collection_column(
        &self,
        collection: &str,
        column: &str,
    ) -> Result<(), MigrationError> {
        let sql = self.generate_drop_column_sql(collection, column);
        self.run("drop_column", &sql).await
    }

    async fn add_index(&self, name: &str, options: &IndexOptions) -> Result<(), MigrationError> {
        let sql = self.generate_add_index_sql(name, options);
        self.run("add_index", &sql).await
    }

    async fn remove_index(&self, collection: &str, name: &str) -> Result<(), MigrationError> {
        let sql = self.generate_remove_index_sql(collection, name);
        self.run("drop_index", &sql).await
    }

    async fn add_primary_key(
        &self,
        collection: &str,
        column: &str,
    ) -> Result<(), MigrationError> {
        let sql = self.generate_add_primary_key_sql(collection, column)?;
        self.run("add_primary_key", &sql).await
    }

    async fn drop_primary_key(
        &self,
        collection: &str,
        column: &str,
    ) -> Result<(), MigrationError> {
        let sql = self.generate_drop_primary_key_sql(collection, column)?;
        self.run("drop_primary_key", &sql).await
    }

    async fn add_foreign_key(
        &self,
        collection: &str,
        options: &ForeignKeyOptions,
    ) -> Result<(), MigrationError> {
        let sql = self.generate_add_foreign_key_sql(collection, options)?;
        self.run("add_foreign_key", &sql).await
    }

    async fn drop_foreign_key(
        &self,
        collection: &str,
        name: &str,
    ) -> Result<(), MigrationError> {
        let sql = self.generate_drop_foreign_key_sql(collection, name)?;
        self.run("drop_foreign_key", &sql).await
    }

    async fn has_collection(&self, collection: &str) -> Result<bool, MigrationError> {
        let sql = self.generate_has_collection_sql(collection);
        let row = sqlx::query(&sql)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| MigrationError::Dialect {
                operation: "has_table".to_string(),
                cause: e.to_string(),
            })?;
        Ok(row.is_some())
    }

    async fn collection_columns(&self, collection: &str) -> Result<Vec<String>, MigrationError> {
        let sql = self.generate_collection_columns_sql(collection);
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| MigrationError::Dialect {
                operation: "get_columns".to_string(),
                cause: e.to_string(),
            })?;

        let mut columns = Vec::new();
        for row in &rows {
            let name: String = row.try_get(0).map_err(|e| MigrationError::Dialect {
                operation: "get_columns".to_string(),
                cause: e.to_string(),
            })?;
            columns.push(name);
        }
        Ok(columns)
    }

    async fn exec_query(
        &self,
        sql: &str,
        params: &[String],
    ) -> Result<Vec<QueryRow>, MigrationError> {
        let mut query = sqlx::query(sql);
        for param in params {
            query = query.bind(param.as_str());
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| MigrationError::Dialect {
                operation: "exec_query".to_string(),
                cause: e.to_string(),
            })?;

        Ok(rows.iter().map(row_to_map).collect())
    }
}
