// マイグレーター
//
// オーケストレーションの中核。マイグレーションユニットの発見、
// 方向とターゲットに応じた実行対象の選択、順序どおりの逐次実行と
// フェイルファースト、ユニットごとの台帳更新を担当します。
//
// すべての公開操作は2つの等価な呼び出し形を持ちます:
// Resultを返すFutureスタイルと、完了コールバックを受け取る
// `*_with`アダプターです。両者は同一のコア実装を共有します。

use crate::adapters::ddl_dialect::DdlDialect;
use crate::core::config::{default_logger, Logger, MigratorConfig};
use crate::core::error::MigrationError;
use crate::core::migration::Direction;
use crate::services::migration_dsl::MigrationDsl;
use crate::services::migration_ledger::MigrationLedger;
use crate::services::migration_unit::MigrationUnit;
use crate::services::module_loader::{FileModuleLoader, ModuleLoader};
use regex::Regex;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

/// タイトルの空白をダッシュに変換
fn slugify(title: &str) -> String {
    let words: Vec<&str> = title.split_whitespace().collect();
    words.join("-")
}

/// 既存ファイルの数字プレフィックスの最大値から次の連番を計算
///
/// # Returns
///
/// 既存ファイルがなければ1
fn next_sequence(files: &[String]) -> u32 {
    let pattern = match Regex::new(r"^(\d+)") {
        Ok(pattern) => pattern,
        Err(_) => return 1,
    };

    files
        .iter()
        .filter_map(|file| pattern.captures(file))
        .filter_map(|captures| captures[1].parse::<u32>().ok())
        .max()
        .unwrap_or(0)
        + 1
}

/// 1回のapply呼び出しで実行するユニットを選択
///
/// 手順:
/// 1. downなら逆順（新しいものから処理）
/// 2. ターゲット名に完全一致するユニットの直後で切り詰め
///    （一致しない場合は切り詰めなし — 互換動作として維持）
/// 3. 適用状態でフィルタ: upは未適用のみ、downは適用済みのみ
/// 4. ターゲットなしのdownは先頭1件だけ（単一ステップロールバック）
pub fn select_units(
    mut units: Vec<MigrationUnit>,
    applied: &[String],
    direction: Direction,
    target: Option<&str>,
) -> Vec<MigrationUnit> {
    let target = target.filter(|name| !name.is_empty());

    if direction == Direction::Down {
        units.reverse();
    }

    if let Some(target) = target {
        if let Some(index) = units.iter().position(|unit| unit.file == target) {
            units.truncate(index + 1);
        }
    }

    let is_applied =
        |unit: &MigrationUnit| applied.iter().any(|name| name.starts_with(unit.stem()));

    match direction {
        Direction::Up => units.retain(|unit| !is_applied(unit)),
        Direction::Down => {
            units.retain(is_applied);
            if target.is_none() {
                units.truncate(1);
            }
        }
    }

    units
}

/// コア操作の結果を完了コールバックへ届ける
///
/// すべての`*_with`アダプターはこのコンビネーター経由で同じコア実装を
/// 包みます。
async fn deliver<T, F>(operation: impl Future<Output = Result<T, MigrationError>>, done: F)
where
    F: FnOnce(Result<T, MigrationError>),
{
    done(operation.await);
}

/// マイグレーター
///
/// 公開呼び出しごとに適用済み集合を台帳から読み直します。呼び出しを
/// またいだ状態は保持しません。
pub struct Migrator {
    dsl: Arc<MigrationDsl>,
    ledger: MigrationLedger,
    loader: Arc<dyn ModuleLoader>,
    dir: PathBuf,
    logger: Logger,
}

impl Migrator {
    /// 新しいマイグレーターを作成
    ///
    /// 相対ソースパスは構築時に一度だけ解決されます。
    pub fn new(dialect: Arc<dyn DdlDialect>, config: MigratorConfig) -> Self {
        let dir = config.resolve_dir();
        let loader = Arc::new(FileModuleLoader::new(dir.clone(), config.format));
        let dsl = Arc::new(MigrationDsl::new(dialect));
        let logger = default_logger();
        let ledger = MigrationLedger::new(dsl.clone(), logger.clone());

        Self {
            dsl,
            ledger,
            loader,
            dir,
            logger,
        }
    }

    /// ロガーを差し替え
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.ledger = MigrationLedger::new(self.dsl.clone(), logger.clone());
        self.logger = logger;
        self
    }

    /// モジュールローダーを差し替え
    pub fn with_loader(mut self, loader: Arc<dyn ModuleLoader>) -> Self {
        self.loader = loader;
        self
    }

    /// スキーマゲートウェイを取得
    pub fn dsl(&self) -> Arc<MigrationDsl> {
        self.dsl.clone()
    }

    /// マイグレーションソースディレクトリを取得
    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    /// ソースディレクトリを作成
    fn mkdir(&self) -> Result<(), MigrationError> {
        self.loader.ensure_dir()
    }

    /// ソースディレクトリと台帳テーブルを準備
    ///
    /// どちらかが失敗した場合は部分復旧を試みず、そのまま失敗します。
    pub async fn setup(&self) -> Result<(), MigrationError> {
        self.mkdir()?;
        self.ledger.ensure_schema().await
    }

    /// `setup`のコールバック版
    pub async fn setup_with<F>(&self, done: F)
    where
        F: FnOnce(Result<(), MigrationError>),
    {
        deliver(self.setup(), done).await;
    }

    /// 台帳テーブルのみを保証
    pub async fn ensure_migrations_table(&self) -> Result<(), MigrationError> {
        self.ledger.ensure_schema().await
    }

    /// `ensure_migrations_table`のコールバック版
    pub async fn ensure_migrations_table_with<F>(&self, done: F)
    where
        F: FnOnce(Result<(), MigrationError>),
    {
        deliver(self.ensure_migrations_table(), done).await;
    }

    /// 指定方向へのマイグレーションを実行
    ///
    /// 適用済み集合はこの呼び出しの冒頭で台帳から読み直され、
    /// キャッシュされません。選択されたユニットは厳密にリスト順で
    /// 1つずつ実行され、最初の失敗で即座に中断します。成功済みの
    /// ユニットは適用されたまま残ります（補償ロールバックなし）。
    async fn perform_migration(
        &self,
        direction: Direction,
        target: Option<&str>,
    ) -> Result<(), MigrationError> {
        let applied = self.ledger.all_applied().await?;
        let units = self.loader.load_units()?;
        let selected = select_units(units, &applied, direction, target);

        for unit in &selected {
            (self.logger)(direction.as_str(), &unit.file);
            unit.run(direction, self.dsl.clone()).await?;

            match direction {
                Direction::Up => self.ledger.record_applied(&unit.file).await?,
                Direction::Down => self.ledger.remove_applied(unit.stem()).await?,
            }
        }

        (self.logger)("migration", "complete");
        Ok(())
    }

    /// 未適用のマイグレーションを適用
    ///
    /// # Arguments
    ///
    /// * `target` - この名前のユニットまで（含む）で打ち切る。Noneなら全件
    pub async fn up(&self, target: Option<&str>) -> Result<(), MigrationError> {
        self.setup().await?;
        self.perform_migration(Direction::Up, target).await
    }

    /// `up`のコールバック版
    pub async fn up_with<F>(&self, target: Option<&str>, done: F)
    where
        F: FnOnce(Result<(), MigrationError>),
    {
        deliver(self.up(target), done).await;
    }

    /// 適用済みマイグレーションを取り消す
    ///
    /// # Arguments
    ///
    /// * `target` - この名前のユニットまで（含む）取り消す。
    ///   Noneなら直近の1件だけ
    pub async fn down(&self, target: Option<&str>) -> Result<(), MigrationError> {
        self.setup().await?;
        self.perform_migration(Direction::Down, target).await
    }

    /// `down`のコールバック版
    pub async fn down_with<F>(&self, target: Option<&str>, done: F)
    where
        F: FnOnce(Result<(), MigrationError>),
    {
        deliver(self.down(target), done).await;
    }

    /// 新しいマイグレーションユニットファイルを生成
    ///
    /// 既存の数字プレフィックスの最大値+1を4桁ゼロ埋めし、タイトルが
    /// あればスラグ化して結合します。
    ///
    /// # Returns
    ///
    /// 生成されたタイトル（拡張子なし）
    pub async fn generate(&self, title: Option<&str>) -> Result<String, MigrationError> {
        self.mkdir()?;

        let files = self.loader.list_files()?;
        let sequence = format!("{:04}", next_sequence(&files));
        let title = match title {
            Some(title) if !title.is_empty() => format!("{}-{}", sequence, slugify(title)),
            _ => sequence,
        };

        let path = self.loader.write_stub(&title)?;
        (self.logger)("create", &path.display().to_string());
        Ok(title)
    }

    /// `generate`のコールバック版
    pub async fn generate_with<F>(&self, title: Option<&str>, done: F)
    where
        F: FnOnce(Result<String, MigrationError>),
    {
        deliver(self.generate(title), done).await;
    }
}
