// マイグレーションユニット
//
// ファイルから読み込まれた1つの可逆スキーマ変更を表現します。
// up/downアクションはロード時に継続スタイル（明示的な完了シグナル）と
// Futureスタイル（Futureの解決が完了）のいずれかのバリアントに
// タグ付けされ、実行時の再判定は行いません。

use crate::core::error::MigrationError;
use crate::core::migration::Direction;
use crate::services::migration_dsl::MigrationDsl;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::oneshot;

/// アクションが返すFuture
pub type ActionFuture = Pin<Box<dyn Future<Output = Result<(), MigrationError>> + Send>>;

/// 継続スタイルのアクション本体が返すFuture
pub type SignalFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// 継続スタイルのアクションに渡される完了シグナル
///
/// アクション本体は処理の完了時に`done`を一度だけ呼び出します。
/// シグナルを送らずに破棄された場合、実行側はユニット実行エラーと
/// して扱います。
pub struct Completion {
    sender: oneshot::Sender<Result<(), MigrationError>>,
}

impl Completion {
    /// 完了を通知
    pub fn done(self, result: Result<(), MigrationError>) {
        // 受信側が先に破棄されていても無視する
        let _ = self.sender.send(result);
    }
}

/// マイグレーションユニットのアクション
///
/// 呼び出し規約ごとのバリアントを持ちます。
#[derive(Clone)]
pub enum Action {
    /// 明示的な完了シグナルを期待する継続スタイル
    Continuation(Arc<dyn Fn(Arc<MigrationDsl>, Completion) -> SignalFuture + Send + Sync>),
    /// Futureを返すスタイル
    Future(Arc<dyn Fn(Arc<MigrationDsl>) -> ActionFuture + Send + Sync>),
}

impl std::fmt::Debug for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Continuation(_) => write!(f, "Action::Continuation"),
            Action::Future(_) => write!(f, "Action::Future"),
        }
    }
}

impl Action {
    /// Futureスタイルのアクションを作成
    pub fn future<F>(body: F) -> Self
    where
        F: Fn(Arc<MigrationDsl>) -> ActionFuture + Send + Sync + 'static,
    {
        Action::Future(Arc::new(body))
    }

    /// 継続スタイルのアクションを作成
    pub fn continuation<F>(body: F) -> Self
    where
        F: Fn(Arc<MigrationDsl>, Completion) -> SignalFuture + Send + Sync + 'static,
    {
        Action::Continuation(Arc::new(body))
    }

    /// 何もしないアクションを作成
    pub fn noop() -> Self {
        Action::future(|_dsl| Box::pin(async { Ok(()) }))
    }
}

/// マイグレーションユニット
///
/// Module Loaderがファイルから構築し、Migratorが1回のup/down呼び出しの
/// 間だけ保持します。永続化はされません。
#[derive(Debug, Clone)]
pub struct MigrationUnit {
    /// ユニットのファイル名（拡張子付き）
    pub file: String,
    /// 適用アクション
    pub up: Action,
    /// 取り消しアクション
    pub down: Action,
}

impl MigrationUnit {
    /// 新しいユニットを作成
    pub fn new(file: &str, up: Action, down: Action) -> Self {
        Self {
            file: file.to_string(),
            up,
            down,
        }
    }

    /// ファイル名から拡張子を除いたステムを取得
    pub fn stem(&self) -> &str {
        Path::new(&self.file)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(&self.file)
    }

    /// 指定方向のアクションを実行
    ///
    /// 継続スタイルは本体を駆動した後、完了シグナルの受信を待ちます。
    /// シグナルなしで破棄された場合は`UnitExecution`エラーになります。
    /// アクション自身のエラーはラップせずそのまま返します。
    pub async fn run(
        &self,
        direction: Direction,
        dsl: Arc<MigrationDsl>,
    ) -> Result<(), MigrationError> {
        let action = match direction {
            Direction::Up => &self.up,
            Direction::Down => &self.down,
        };

        match action {
            Action::Future(body) => body(dsl).await,
            Action::Continuation(body) => {
                let (sender, receiver) = oneshot::channel();
                body(dsl, Completion { sender }).await;
                match receiver.await {
                    Ok(result) => result,
                    Err(_) => Err(MigrationError::UnitExecution {
                        unit: self.file.clone(),
                        direction: direction.as_str().to_string(),
                        cause: "completion signal dropped without being called".to_string(),
                    }),
                }
            }
        }
    }
}
