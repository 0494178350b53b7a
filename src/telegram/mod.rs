//! Telegram transport built on teloxide.

pub mod client;

pub use client::TelegramClient;
