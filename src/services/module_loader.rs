// モジュールローダー
//
// マイグレーションソースディレクトリのファイルを実行可能な
// マイグレーションユニットへ変換するコラボレーター。SQL形式
// （`-- up` / `-- down` セクション）とYAML形式（`up:` / `down:` リスト）
// の2形式をサポートし、generate用のスタブテンプレートも書き出します。

use crate::core::config::SourceFormat;
use crate::core::error::MigrationError;
use crate::services::migration_unit::{Action, MigrationUnit};
use regex::Regex;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// モジュールローダー
///
/// Migratorが依存するファイルシステム側のコラボレーター。
pub trait ModuleLoader: Send + Sync {
    /// マイグレーションソースディレクトリを作成（存在すれば何もしない）
    fn ensure_dir(&self) -> Result<(), MigrationError>;

    /// 数字プレフィックスと拡張子が一致するファイル名を昇順で取得
    fn list_files(&self) -> Result<Vec<String>, MigrationError>;

    /// すべてのユニットをファイル名昇順で読み込む
    fn load_units(&self) -> Result<Vec<MigrationUnit>, MigrationError>;

    /// スタブユニットファイルを書き出す
    ///
    /// # Arguments
    ///
    /// * `title` - 拡張子を除いたファイル名
    ///
    /// # Returns
    ///
    /// 書き出したファイルのパス
    fn write_stub(&self, title: &str) -> Result<PathBuf, MigrationError>;
}

/// YAML形式ユニットファイルのDTO
#[derive(Debug, Deserialize)]
struct UnitFileDto {
    #[serde(default)]
    up: Vec<String>,
    #[serde(default)]
    down: Vec<String>,
}

/// SQL形式ユニットファイルをセクションに分解
///
/// `-- up` / `-- down` をセクションマーカーとして扱い、各セクションを
/// `;`区切りの文へ分割します。コメント行は無視されます。
///
/// # Returns
///
/// (upの文リスト, downの文リスト)
pub fn parse_sql_unit(content: &str) -> (Vec<String>, Vec<String>) {
    #[derive(PartialEq)]
    enum Section {
        None,
        Up,
        Down,
    }

    let mut section = Section::None;
    let mut up_lines: Vec<&str> = Vec::new();
    let mut down_lines: Vec<&str> = Vec::new();

    for line in content.lines() {
        let trimmed = line.trim();
        let marker = trimmed.to_lowercase();
        if marker == "-- up" {
            section = Section::Up;
            continue;
        }
        if marker == "-- down" {
            section = Section::Down;
            continue;
        }
        if trimmed.starts_with("--") {
            continue;
        }
        match section {
            Section::Up => up_lines.push(line),
            Section::Down => down_lines.push(line),
            Section::None => {}
        }
    }

    (
        split_statements(&up_lines.join("\n")),
        split_statements(&down_lines.join("\n")),
    )
}

/// `;`区切りの文へ分割
fn split_statements(sql: &str) -> Vec<String> {
    sql.split(';')
        .map(str::trim)
        .filter(|statement| !statement.is_empty())
        .map(str::to_string)
        .collect()
}

/// 文リストをFutureスタイルのアクションにコンパイル
///
/// 各文をスキーマゲートウェイの生クエリとして順に実行します。
fn statements_action(statements: Vec<String>) -> Action {
    Action::future(move |dsl| {
        let statements = statements.clone();
        Box::pin(async move {
            for sql in &statements {
                dsl.exec_query(sql, &[]).await?;
            }
            Ok(())
        })
    })
}

/// ファイルシステム上のモジュールローダー
///
/// ディレクトリは構築時に解決済みの絶対パスを受け取り、以後の
/// プロセス状態には依存しません。
pub struct FileModuleLoader {
    dir: PathBuf,
    format: SourceFormat,
}

impl FileModuleLoader {
    /// 新しいローダーを作成
    ///
    /// # Arguments
    ///
    /// * `dir` - 解決済みのマイグレーションソースディレクトリ
    /// * `format` - ユニットファイルの形式
    pub fn new(dir: PathBuf, format: SourceFormat) -> Self {
        Self { dir, format }
    }

    /// ソースディレクトリのパスを取得
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_system_error(&self, path: &Path, cause: impl std::fmt::Display) -> MigrationError {
        MigrationError::FileSystem {
            path: path.display().to_string(),
            cause: cause.to_string(),
        }
    }

    /// ファイル内容をユニットに変換
    fn build_unit(&self, file: &str, content: &str) -> Result<MigrationUnit, MigrationError> {
        let (up, down) = match self.format {
            SourceFormat::Sql => parse_sql_unit(content),
            SourceFormat::Yaml => {
                let dto: UnitFileDto = serde_saphyr::from_str(content)
                    .map_err(|e| self.file_system_error(&self.dir.join(file), e))?;
                (dto.up, dto.down)
            }
        };

        Ok(MigrationUnit::new(
            file,
            statements_action(up),
            statements_action(down),
        ))
    }

    /// スタブテンプレートを生成
    fn stub_template(&self, title: &str) -> String {
        let created_at = chrono::Utc::now().to_rfc3339();
        match self.format {
            SourceFormat::Sql => format!(
                "-- {}\n-- created at {}\n\n-- up\n\n-- down\n",
                title, created_at
            ),
            SourceFormat::Yaml => format!(
                "# {}\n# created at {}\n\nup: []\ndown: []\n",
                title, created_at
            ),
        }
    }
}

impl ModuleLoader for FileModuleLoader {
    fn ensure_dir(&self) -> Result<(), MigrationError> {
        fs::create_dir_all(&self.dir).map_err(|e| self.file_system_error(&self.dir, e))
    }

    fn list_files(&self) -> Result<Vec<String>, MigrationError> {
        let pattern = Regex::new(&format!(r"^\d+.*\.{}$", self.format.extension()))
            .map_err(|e| self.file_system_error(&self.dir, e))?;

        let entries = fs::read_dir(&self.dir).map_err(|e| self.file_system_error(&self.dir, e))?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| self.file_system_error(&self.dir, e))?;
            let name = entry.file_name();
            if let Some(name) = name.to_str() {
                if pattern.is_match(name) {
                    files.push(name.to_string());
                }
            }
        }
        files.sort();
        Ok(files)
    }

    fn load_units(&self) -> Result<Vec<MigrationUnit>, MigrationError> {
        let mut units = Vec::new();
        for file in self.list_files()? {
            let path = self.dir.join(&file);
            let content =
                fs::read_to_string(&path).map_err(|e| self.file_system_error(&path, e))?;
            units.push(self.build_unit(&file, &content)?);
        }
        Ok(units)
    }

    fn write_stub(&self, title: &str) -> Result<PathBuf, MigrationError> {
        let path = self
            .dir
            .join(format!("{}.{}", title, self.format.extension()));
        fs::write(&path, self.stub_template(title))
            .map_err(|e| self.file_system_error(&path, e))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sql_unit_sections() {
        let content = "\
-- 0001-create-users
-- created at 2026-01-01T00:00:00Z

-- up
CREATE TABLE users (id INTEGER);
CREATE INDEX idx_users ON users (id);

-- down
DROP TABLE users;
";
        let (up, down) = parse_sql_unit(content);

        assert_eq!(up.len(), 2);
        assert_eq!(up[0], "CREATE TABLE users (id INTEGER)");
        assert_eq!(up[1], "CREATE INDEX idx_users ON users (id)");
        assert_eq!(down, vec!["DROP TABLE users".to_string()]);
    }

    #[test]
    fn test_parse_sql_unit_empty_sections() {
        let (up, down) = parse_sql_unit("-- up\n\n-- down\n");
        assert!(up.is_empty());
        assert!(down.is_empty());
    }

    #[test]
    fn test_parse_sql_unit_ignores_comment_lines() {
        let content = "-- up\n-- a comment\nCREATE TABLE t1 (id INTEGER);\n-- down\n";
        let (up, down) = parse_sql_unit(content);
        assert_eq!(up, vec!["CREATE TABLE t1 (id INTEGER)".to_string()]);
        assert!(down.is_empty());
    }

    #[test]
    fn test_parse_sql_unit_markers_are_case_insensitive() {
        let content = "-- UP\nCREATE TABLE t1 (id INTEGER);\n-- DOWN\nDROP TABLE t1;\n";
        let (up, down) = parse_sql_unit(content);
        assert_eq!(up.len(), 1);
        assert_eq!(down.len(), 1);
    }

    #[test]
    fn test_split_statements_skips_blank() {
        let statements = split_statements("A;\n\n ;B;");
        assert_eq!(statements, vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn test_stub_template_sql() {
        let loader = FileModuleLoader::new(PathBuf::from("/tmp/mig"), SourceFormat::Sql);
        let template = loader.stub_template("0001-create-users");

        assert!(template.contains("-- 0001-create-users"));
        assert!(template.contains("-- up"));
        assert!(template.contains("-- down"));
        // 生成したスタブはそのままパースできる
        let (up, down) = parse_sql_unit(&template);
        assert!(up.is_empty());
        assert!(down.is_empty());
    }

    #[test]
    fn test_stub_template_yaml_parses_as_empty_unit() {
        let loader = FileModuleLoader::new(PathBuf::from("/tmp/mig"), SourceFormat::Yaml);
        let template = loader.stub_template("0002");
        let dto: UnitFileDto = serde_saphyr::from_str(&template).unwrap();
        assert!(dto.up.is_empty());
        assert!(dto.down.is_empty());
    }

    #[test]
    fn test_yaml_unit_parsing() {
        let content = "\
up:
  - CREATE TABLE t1 (id INTEGER)
  - CREATE TABLE t2 (id INTEGER)
down:
  - DROP TABLE t2
  - DROP TABLE t1
";
        let dto: UnitFileDto = serde_saphyr::from_str(content).unwrap();
        assert_eq!(dto.up.len(), 2);
        assert_eq!(dto.down.len(), 2);
        assert_eq!(dto.up[0], "CREATE TABLE t1 (id INTEGER)");
    }
}
