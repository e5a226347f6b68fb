//! UseCase 層
//!
//! 接続の登録・切断と、アカウント変更の配信を実装するレイヤー。
//! UI 層（WebSocket ハンドラ、Change Router）から呼び出され、Domain 層を操作します。

pub mod disconnect_connection;
pub mod error;
pub mod register_user;
pub mod route_account_change;

pub use disconnect_connection::DisconnectConnectionUseCase;
pub use error::RegisterUserError;
pub use register_user::{RegisterOutcome, RegisterUserUseCase};
pub use route_account_change::{RouteAccountChangeUseCase, RouteOutcome};
