// マイグレーション台帳の統合テスト
//
// v1からv2へのスキーマアップグレード、適用記録の読み書き、
// ユニーク索引の作成をSQLiteデータベースに対して検証します。

mod common;

use common::{connect, migrator, seed_v1_ledger, table_names, workspace};
use lamina::core::config::silent_logger;
use lamina::services::migration_ledger::{MigrationLedger, LEDGER_INDEX, LEDGER_TABLE};

#[tokio::test]
async fn test_ensure_schema_creates_v2_table() {
    let workspace = workspace();
    let dialect = connect(&workspace).await;
    let migrator = migrator(dialect, &workspace);
    let dsl = migrator.dsl();
    let ledger = MigrationLedger::new(dsl.clone(), silent_logger());

    ledger.ensure_schema().await.expect("ensure");

    assert!(table_names(&dsl).await.contains(&LEDGER_TABLE.to_string()));
    let columns = dsl.get_columns(LEDGER_TABLE).await.expect("columns");
    assert_eq!(columns, vec!["migration"]);
}

#[tokio::test]
async fn test_ensure_schema_creates_unique_index() {
    let workspace = workspace();
    let dialect = connect(&workspace).await;
    let migrator = migrator(dialect, &workspace);
    let dsl = migrator.dsl();
    let ledger = MigrationLedger::new(dsl.clone(), silent_logger());

    ledger.ensure_schema().await.expect("ensure");

    let rows = dsl
        .exec_query(
            "SELECT name FROM sqlite_master WHERE type = 'index' AND name = 'unique_orm_migrations'",
            &[],
        )
        .await
        .expect("index query");
    assert_eq!(rows.len(), 1);
    assert_eq!(LEDGER_INDEX, "unique_orm_migrations");
}

#[tokio::test]
async fn test_ensure_schema_on_v2_is_noop() {
    let workspace = workspace();
    let dialect = connect(&workspace).await;
    let migrator = migrator(dialect, &workspace);
    let dsl = migrator.dsl();
    let ledger = MigrationLedger::new(dsl.clone(), silent_logger());

    ledger.ensure_schema().await.expect("first ensure");
    ledger.record_applied("0001-a.sql").await.expect("record");
    ledger.ensure_schema().await.expect("second ensure");

    // 既存の記録は温存される
    let applied = ledger.all_applied().await.expect("applied");
    assert_eq!(applied, vec!["0001-a.sql"]);
}

#[tokio::test]
async fn test_upgrade_collapses_v1_history() {
    let workspace = workspace();
    let dialect = connect(&workspace).await;
    let migrator = migrator(dialect, &workspace);
    let dsl = migrator.dsl();
    // Aは適用後に取り消し済み、Bは適用済みのまま
    seed_v1_ledger(
        &dsl,
        &[
            ("0001-a.sql", "up", "2020-01-01 00:00:01"),
            ("0001-a.sql", "down", "2020-01-01 00:00:02"),
            ("0002-b.sql", "up", "2020-01-01 00:00:03"),
        ],
    )
    .await;

    let ledger = MigrationLedger::new(dsl.clone(), silent_logger());
    ledger.ensure_schema().await.expect("upgrade");

    let columns = dsl.get_columns(LEDGER_TABLE).await.expect("columns");
    assert_eq!(columns, vec!["migration"]);

    let applied = ledger.all_applied().await.expect("applied");
    assert_eq!(applied, vec!["0002-b.sql"]);
}

#[tokio::test]
async fn test_upgrade_removes_orphan_down() {
    let workspace = workspace();
    let dialect = connect(&workspace).await;
    let migrator = migrator(dialect, &workspace);
    let dsl = migrator.dsl();
    // 対応するup行のないdown行は単独で削除される
    seed_v1_ledger(
        &dsl,
        &[
            ("0001-a.sql", "down", "2020-01-01 00:00:01"),
            ("0002-b.sql", "up", "2020-01-01 00:00:02"),
        ],
    )
    .await;

    let ledger = MigrationLedger::new(dsl.clone(), silent_logger());
    ledger.ensure_schema().await.expect("upgrade");

    let applied = ledger.all_applied().await.expect("applied");
    assert_eq!(applied, vec!["0002-b.sql"]);
}

#[tokio::test]
async fn test_upgrade_keeps_reapplied_migration() {
    let workspace = workspace();
    let dialect = connect(&workspace).await;
    let migrator = migrator(dialect, &workspace);
    let dsl = migrator.dsl();
    // up → down → up の履歴は最終的に適用済み1行に畳まれる
    seed_v1_ledger(
        &dsl,
        &[
            ("0001-a.sql", "up", "2020-01-01 00:00:01"),
            ("0001-a.sql", "down", "2020-01-01 00:00:02"),
            ("0001-a.sql", "up", "2020-01-01 00:00:03"),
        ],
    )
    .await;

    let ledger = MigrationLedger::new(dsl.clone(), silent_logger());
    ledger.ensure_schema().await.expect("upgrade");

    let applied = ledger.all_applied().await.expect("applied");
    assert_eq!(applied, vec!["0001-a.sql"]);
}

#[tokio::test]
async fn test_last_applied_returns_newest_by_name() {
    let workspace = workspace();
    let dialect = connect(&workspace).await;
    let migrator = migrator(dialect, &workspace);
    let ledger = MigrationLedger::new(migrator.dsl(), silent_logger());

    ledger.ensure_schema().await.expect("ensure");
    assert_eq!(ledger.last_applied().await.expect("empty"), None);

    ledger.record_applied("0001-a.sql").await.expect("record");
    ledger.record_applied("0002-b.sql").await.expect("record");

    assert_eq!(
        ledger.last_applied().await.expect("last"),
        Some("0002-b.sql".to_string())
    );
}

#[tokio::test]
async fn test_remove_applied_matches_by_stem_prefix() {
    let workspace = workspace();
    let dialect = connect(&workspace).await;
    let migrator = migrator(dialect, &workspace);
    let ledger = MigrationLedger::new(migrator.dsl(), silent_logger());

    ledger.ensure_schema().await.expect("ensure");
    ledger.record_applied("0001-a.sql").await.expect("record");
    ledger.record_applied("0002-b.sql").await.expect("record");

    // 拡張子なしのステムで該当記録だけを削除する
    ledger.remove_applied("0002-b").await.expect("remove");

    let applied = ledger.all_applied().await.expect("applied");
    assert_eq!(applied, vec!["0001-a.sql"]);
}
