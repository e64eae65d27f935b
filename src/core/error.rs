// エラー型定義
//
// マイグレーション全体で使用されるカスタムエラー型を提供します。
// thiserrorを使用して、MigrationErrorの各系統を定義します。

use thiserror::Error;

/// マイグレーションエラー
///
/// オーケストレーション・台帳・スキーマゲートウェイ・モジュールローダーの
/// 全失敗系統を表現します。自動リトライは行わず、失敗は呼び出し元に
/// そのまま伝播されます。
#[derive(Debug, Clone, Error)]
pub enum MigrationError {
    /// Unknown column type (local check, before any dialect call)
    #[error("Unknown type for column '{column}' in '{collection}'")]
    UnknownType {
        /// 対象コレクション（テーブル）名
        collection: String,
        /// 型を解決できなかったカラム名
        column: String,
    },

    /// Dialect rejected a schema operation
    #[error("Dialect error during '{operation}': {cause}")]
    Dialect {
        /// 失敗したスキーマ操作名
        operation: String,
        /// エラー原因
        cause: String,
    },

    /// Ledger read failure
    #[error("Ledger read error: {message} (cause: {cause})")]
    Read {
        /// エラーメッセージ
        message: String,
        /// エラー原因
        cause: String,
    },

    /// Ledger write failure
    #[error("Ledger write error: {message} (cause: {cause})")]
    Write {
        /// エラーメッセージ
        message: String,
        /// エラー原因
        cause: String,
    },

    /// Failure during the one-time v1 -> v2 ledger upgrade
    #[error("Ledger schema upgrade error: {message} (cause: {cause})")]
    SchemaUpgrade {
        /// エラーメッセージ
        message: String,
        /// エラー原因
        cause: String,
    },

    /// A migration unit's action failed
    #[error("Migration unit '{unit}' failed ({direction}): {cause}")]
    UnitExecution {
        /// 失敗したユニットのファイル名
        unit: String,
        /// 実行方向（up / down）
        direction: String,
        /// エラー原因
        cause: String,
    },

    /// Migration source directory creation/listing failure
    #[error("File system error at '{path}': {cause}")]
    FileSystem {
        /// 対象パス
        path: String,
        /// エラー原因
        cause: String,
    },
}

impl MigrationError {
    /// 型解決エラーかどうか
    pub fn is_unknown_type(&self) -> bool {
        matches!(self, MigrationError::UnknownType { .. })
    }

    /// 方言エラーかどうか
    pub fn is_dialect(&self) -> bool {
        matches!(self, MigrationError::Dialect { .. })
    }

    /// 台帳読み取りエラーかどうか
    pub fn is_read(&self) -> bool {
        matches!(self, MigrationError::Read { .. })
    }

    /// 台帳書き込みエラーかどうか
    pub fn is_write(&self) -> bool {
        matches!(self, MigrationError::Write { .. })
    }

    /// 台帳アップグレードエラーかどうか
    pub fn is_schema_upgrade(&self) -> bool {
        matches!(self, MigrationError::SchemaUpgrade { .. })
    }

    /// ユニット実行エラーかどうか
    pub fn is_unit_execution(&self) -> bool {
        matches!(self, MigrationError::UnitExecution { .. })
    }

    /// ファイルシステムエラーかどうか
    pub fn is_file_system(&self) -> bool {
        matches!(self, MigrationError::FileSystem { .. })
    }
}
