pub mod help;
pub mod register;
pub mod starboard;

use crate::data::State;
use color_eyre::eyre::Error;

/// Every command the bot registers, in one place.
pub fn all_commands() -> Vec<poise::Command<State, Error>> {
    vec![
        help::help(),
        register::register(),
        starboard::starboard(),
    ]
}
