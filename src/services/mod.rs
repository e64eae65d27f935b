// Services Layer
// マイグレーションのオーケストレーションを実行するサービス層

pub mod migration_dsl;
pub mod migration_ledger;
pub mod migration_unit;
pub mod migrator;
pub mod module_loader;
