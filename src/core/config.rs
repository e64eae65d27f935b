// 設定管理
//
// データベース方言、マイグレーションソースの設定、
// およびキー付きメッセージを出力するロガーを提供します。

use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// データベース方言
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[serde(rename = "postgresql")]
    PostgreSQL,
    #[serde(rename = "mysql")]
    MySQL,
    #[serde(rename = "sqlite")]
    SQLite,
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dialect::PostgreSQL => write!(f, "postgresql"),
            Dialect::MySQL => write!(f, "mysql"),
            Dialect::SQLite => write!(f, "sqlite"),
        }
    }
}

impl Dialect {
    /// バインドパラメータのプレースホルダーを生成
    ///
    /// # Arguments
    ///
    /// * `position` - 1始まりのパラメータ位置
    ///
    /// # Returns
    ///
    /// PostgreSQLは`$n`、MySQL/SQLiteは`?`
    pub fn placeholder(&self, position: usize) -> String {
        match self {
            Dialect::PostgreSQL => format!("${}", position),
            Dialect::MySQL | Dialect::SQLite => "?".to_string(),
        }
    }
}

/// マイグレーションユニットファイルの形式
///
/// 1つのMigratorインスタンスにつき1形式に固定されます。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    /// `-- up` / `-- down` セクションを持つSQLファイル
    Sql,
    /// `up:` / `down:` の文字列リストを持つYAMLファイル
    Yaml,
}

impl SourceFormat {
    /// ファイル拡張子
    pub fn extension(&self) -> &'static str {
        match self {
            SourceFormat::Sql => "sql",
            SourceFormat::Yaml => "yaml",
        }
    }
}

/// Migratorの構築時設定
///
/// 相対パスは構築時に一度だけ`base_dir`（未指定ならプロセスの
/// カレントディレクトリ）に対して解決され、以後のプロセス状態には
/// 依存しません。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigratorConfig {
    /// マイグレーションソースディレクトリ
    #[serde(default = "default_migrations_dir")]
    pub dir: PathBuf,

    /// ユニットファイルの形式
    #[serde(default = "default_source_format")]
    pub format: SourceFormat,

    /// 相対パス解決の基準ディレクトリ
    #[serde(default)]
    pub base_dir: Option<PathBuf>,
}

fn default_migrations_dir() -> PathBuf {
    PathBuf::from("migrations")
}

fn default_source_format() -> SourceFormat {
    SourceFormat::Sql
}

impl Default for MigratorConfig {
    fn default() -> Self {
        Self {
            dir: default_migrations_dir(),
            format: default_source_format(),
            base_dir: None,
        }
    }
}

impl MigratorConfig {
    /// マイグレーションソースディレクトリの絶対パスを解決
    ///
    /// `base_dir`が未指定の場合はカレントディレクトリを一度だけ読み取ります。
    pub fn resolve_dir(&self) -> PathBuf {
        let base = match &self.base_dir {
            Some(base) => base.clone(),
            None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        };
        base.join(&self.dir)
    }
}

/// キー付きメッセージを受け取るロガー
pub type Logger = Arc<dyn Fn(&str, &str) + Send + Sync>;

/// デフォルトロガーを作成
///
/// キーをグレー、メッセージをシアンで出力します。
pub fn default_logger() -> Logger {
    Arc::new(|key, message| {
        println!("  {} : {}", key.bright_black(), message.cyan());
    })
}

/// 何も出力しないロガーを作成
pub fn silent_logger() -> Logger {
    Arc::new(|_, _| {})
}
