//! Discord front end for Hinata.
//!
//! Prefix commands, mention routing, embeds and the audit log channel, on
//! top of serenity's gateway client.

pub mod bot;
pub mod commands;
pub mod embeds;
pub mod error;
pub mod handler;
pub mod log_sink;

pub use {
    bot::Bot,
    commands::{Command, ImageOptions, parse_command},
    error::{Error, Result},
    handler::{BotState, HinataHandler, chunk_message, media_filename},
    log_sink::{ChannelTarget, DiscordLogSink, LogForwarder, LogTarget},
};
