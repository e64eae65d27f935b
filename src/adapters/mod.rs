// Adapters
// DDL方言の抽象化とSQLxによる実装

pub mod ddl_dialect;
pub mod sql_dialect;
