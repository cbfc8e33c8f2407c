//! Default event name aliases

use std::collections::HashMap;

const DEFAULT_ALIASES: &[(&str, &str)] = &[
    ("connect", "ready"),
    ("message", "message_create"),
    ("message_edit", "message_update"),
    ("guild_join", "guild_create"),
    ("guild_leave", "guild_delete"),
    ("member_join", "guild_member_add"),
    ("member_update", "guild_member_update"),
    ("member_leave", "guild_member_remove"),
    ("reaction_add", "message_reaction_add"),
    ("reaction_remove", "message_reaction_remove"),
    ("typing", "typing_start"),
    ("presence", "presence_update"),
];

/// Alias table a new client starts from
pub fn default_aliases() -> HashMap<String, String> {
    DEFAULT_ALIASES
        .iter()
        .map(|(alias, target)| ((*alias).to_string(), (*target).to_string()))
        .collect()
}
