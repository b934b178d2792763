// SPDX-License-Identifier: GPL-3.0-or-later

pub mod args;
pub mod command;
pub mod config;
pub mod context;
pub mod conventions;
pub mod flow;
pub mod modes;
pub mod output;
pub mod semantic;
