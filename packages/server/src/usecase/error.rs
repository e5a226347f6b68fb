//! UseCase 層のエラー定義

use thiserror::Error;

use crate::domain::ValueObjectError;

/// ユーザー登録のエラー
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegisterUserError {
    /// user_id が空、または長すぎる
    #[error("invalid user id: {0}")]
    InvalidUserId(#[from] ValueObjectError),
}
