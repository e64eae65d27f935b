// マイグレーションドメインモデル
//
// マイグレーションの方向と台帳レコードを表現する型システム。
// Direction, MigrationRecord, LegacyMigrationRecord を提供します。

use serde::{Deserialize, Serialize};

/// マイグレーションの実行方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// スキーマ変更を適用する
    Up,
    /// スキーマ変更を取り消す
    Down,
}

impl Direction {
    /// 文字列表現を取得
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }

    /// 文字列から方向をパース
    ///
    /// # Returns
    ///
    /// "up" / "down" 以外はNone
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "up" => Some(Direction::Up),
            "down" => Some(Direction::Down),
            _ => None,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 台帳レコード（v2スキーマ）
///
/// 行の存在が「現在適用済み」を意味します。タイムスタンプや方向は
/// v2では保持されません。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationRecord {
    /// 適用時に記録されたマイグレーション名（ユニットのファイル名）
    pub name: String,
}

/// 台帳レコード（レガシーv1スキーマ）
///
/// 1つのマイグレーション名に対して複数行（方向ごと、時刻ごと）が
/// 存在し得ます。v1→v2アップグレードでのみ読み取られます。
///
/// `created_at`はデータベース上の生の文字列表現をそのまま保持します。
/// アップグレード時の厳密一致削除で同じ値をバインドし直すためです。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyMigrationRecord {
    /// マイグレーション名
    pub migration: String,
    /// 記録された方向
    pub direction: Direction,
    /// 記録時刻（生の文字列表現）
    pub created_at: String,
}
