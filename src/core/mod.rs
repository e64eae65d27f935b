// Core Domain
// 設定、エラー型、マイグレーションデータモデルの純粋なビジネスロジック

pub mod config;
pub mod error;
pub mod migration;
