// 統合テスト共通ヘルパー
//
// Dockerに依存せず、tempfileのSQLiteデータベースに対して
// マイグレーションエンジン全体を検証するためのヘルパー群。

#![allow(dead_code)]

use lamina::adapters::sql_dialect::SqlxDdlDialect;
use lamina::core::config::{silent_logger, Dialect, MigratorConfig, SourceFormat};
use lamina::core::error::MigrationError;
use lamina::services::migration_dsl::MigrationDsl;
use lamina::services::migration_unit::{Action, MigrationUnit};
use lamina::services::migrator::Migrator;
use lamina::services::module_loader::ModuleLoader;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// テスト用のワークスペースディレクトリを作成
pub fn workspace() -> TempDir {
    TempDir::new().expect("temp dir")
}

/// ワークスペース内のファイルを使うSQLite方言に接続
///
/// `:memory:`はプール接続ごとに別のデータベースになるため、
/// ファイルベースのデータベースを使います。
pub async fn connect(workspace: &TempDir) -> Arc<SqlxDdlDialect> {
    let db_path = workspace.path().join("test.db");
    let url = format!("sqlite://{}?mode=rwc", db_path.display());
    let dialect = SqlxDdlDialect::connect(Dialect::SQLite, &url)
        .await
        .expect("sqlite connection");
    Arc::new(dialect)
}

/// サイレントロガー付きのマイグレーターを構築
pub fn migrator(dialect: Arc<SqlxDdlDialect>, workspace: &TempDir) -> Migrator {
    let config = MigratorConfig {
        dir: PathBuf::from("migrations"),
        format: SourceFormat::Sql,
        base_dir: Some(workspace.path().to_path_buf()),
    };
    Migrator::new(dialect, config).with_logger(silent_logger())
}

/// 固定のユニットリストを返すモジュールローダー
///
/// ファイルシステムを経由せず、テストが組み立てたユニットを
/// そのままマイグレーターへ供給します。
pub struct StaticLoader {
    units: Vec<MigrationUnit>,
}

impl StaticLoader {
    pub fn new(units: Vec<MigrationUnit>) -> Arc<Self> {
        Arc::new(Self { units })
    }
}

impl ModuleLoader for StaticLoader {
    fn ensure_dir(&self) -> Result<(), MigrationError> {
        Ok(())
    }

    fn list_files(&self) -> Result<Vec<String>, MigrationError> {
        Ok(self.units.iter().map(|unit| unit.file.clone()).collect())
    }

    fn load_units(&self) -> Result<Vec<MigrationUnit>, MigrationError> {
        Ok(self.units.clone())
    }

    fn write_stub(&self, title: &str) -> Result<PathBuf, MigrationError> {
        Err(MigrationError::FileSystem {
            path: title.to_string(),
            cause: "static loader does not write stubs".to_string(),
        })
    }
}

/// upでテーブルを作成し、downで削除するユニット
pub fn table_unit(file: &str, table: &str) -> MigrationUnit {
    let create = format!("CREATE TABLE {} (id INTEGER)", table);
    let drop = format!("DROP TABLE {}", table);
    MigrationUnit::new(
        file,
        Action::future(move |dsl| {
            let sql = create.clone();
            Box::pin(async move {
                dsl.exec_query(&sql, &[]).await?;
                Ok(())
            })
        }),
        Action::future(move |dsl| {
            let sql = drop.clone();
            Box::pin(async move {
                dsl.exec_query(&sql, &[]).await?;
                Ok(())
            })
        }),
    )
}

/// upが常に失敗するユニット
pub fn failing_unit(file: &str) -> MigrationUnit {
    let name = file.to_string();
    MigrationUnit::new(
        file,
        Action::future(move |_dsl| {
            let name = name.clone();
            Box::pin(async move {
                Err(MigrationError::Dialect {
                    operation: name,
                    cause: "intentional failure".to_string(),
                })
            })
        }),
        Action::noop(),
    )
}

/// 完了シグナルスタイルでテーブルを作成するユニット
pub fn continuation_unit(file: &str, table: &str) -> MigrationUnit {
    let create = format!("CREATE TABLE {} (id INTEGER)", table);
    let drop = format!("DROP TABLE {}", table);
    MigrationUnit::new(
        file,
        Action::continuation(move |dsl, completion| {
            let sql = create.clone();
            Box::pin(async move {
                let result = dsl.exec_query(&sql, &[]).await.map(|_| ());
                completion.done(result);
            })
        }),
        Action::continuation(move |dsl, completion| {
            let sql = drop.clone();
            Box::pin(async move {
                let result = dsl.exec_query(&sql, &[]).await.map(|_| ());
                completion.done(result);
            })
        }),
    )
}

/// データベース内のテーブル名一覧を取得
pub async fn table_names(dsl: &MigrationDsl) -> Vec<String> {
    let rows = dsl
        .exec_query(
            "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
            &[],
        )
        .await
        .expect("sqlite_master query");

    rows.iter()
        .filter_map(|row| row.get("name"))
        .filter_map(|value| value.as_str().map(str::to_string))
        .collect()
}

/// v1スキーマの台帳テーブルを作成し、履歴行を投入
pub async fn seed_v1_ledger(dsl: &MigrationDsl, rows: &[(&str, &str, &str)]) {
    dsl.exec_query(
        "CREATE TABLE orm_migrations (migration TEXT NOT NULL, direction TEXT NOT NULL, created_at TEXT NOT NULL)",
        &[],
    )
    .await
    .expect("v1 table");

    for (migration, direction, created_at) in rows {
        let sql = format!(
            "INSERT INTO orm_migrations (migration, direction, created_at) VALUES ('{}', '{}', '{}')",
            migration, direction, created_at
        );
        dsl.exec_query(&sql, &[]).await.expect("v1 row");
    }
}
