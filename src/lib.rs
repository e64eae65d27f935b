// Laminaライブラリのエントリーポイント
//
// モジュール構造:
// - core: コアドメイン（設定、エラー型、マイグレーションデータモデル）
// - adapters: DDL方言とデータベースアクセスを抽象化
// - services: スキーマゲートウェイ、台帳、モジュールローダー、オーケストレーション

pub mod core;
pub mod adapters;
pub mod services;
