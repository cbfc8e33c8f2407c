//! Known API endpoints

use reqwest::Method;

use super::Route;

// =========================================================================
// Gateway
// =========================================================================
pub const GET_GATEWAY: Route = Route::new(Method::GET, "/gateway");
pub const GET_GATEWAY_BOT: Route = Route::new(Method::GET, "/gateway/bot");

// =========================================================================
// Channel
// =========================================================================
pub const GET_CHANNEL: Route = Route::new(Method::GET, "/channels/{channel}");
pub const MODIFY_CHANNEL: Route = Route::new(Method::PATCH, "/channels/{channel}");
pub const DELETE_CHANNEL: Route = Route::new(Method::DELETE, "/channels/{channel}");
pub const GET_CHANNEL_MESSAGES: Route = Route::new(Method::GET, "/channels/{channel}/messages");
pub const GET_CHANNEL_MESSAGE: Route =
    Route::new(Method::GET, "/channels/{channel}/messages/{message}");
pub const CREATE_MESSAGE: Route = Route::new(Method::POST, "/channels/{channel}/messages");
pub const EDIT_MESSAGE: Route =
    Route::new(Method::PATCH, "/channels/{channel}/messages/{message}");
pub const DELETE_MESSAGE: Route =
    Route::new(Method::DELETE, "/channels/{channel}/messages/{message}");
pub const BULK_DELETE_MESSAGES: Route =
    Route::new(Method::POST, "/channels/{channel}/messages/bulk-delete");
pub const CREATE_REACTION: Route = Route::new(
    Method::PUT,
    "/channels/{channel}/messages/{message}/reactions/{emoji}/@me",
);
pub const DELETE_OWN_REACTION: Route = Route::new(
    Method::DELETE,
    "/channels/{channel}/messages/{message}/reactions/{emoji}/@me",
);
pub const DELETE_ALL_REACTIONS: Route = Route::new(
    Method::DELETE,
    "/channels/{channel}/messages/{message}/reactions",
);
pub const TRIGGER_TYPING_INDICATOR: Route =
    Route::new(Method::POST, "/channels/{channel}/typing");
pub const GET_PINNED_MESSAGES: Route = Route::new(Method::GET, "/channels/{channel}/pins");
pub const ADD_PINNED_MESSAGE: Route =
    Route::new(Method::PUT, "/channels/{channel}/pins/{message}");
pub const DELETE_PINNED_MESSAGE: Route =
    Route::new(Method::DELETE, "/channels/{channel}/pins/{message}");

// =========================================================================
// Guild
// =========================================================================
pub const GET_GUILD: Route = Route::new(Method::GET, "/guilds/{guild}");
pub const GET_GUILD_CHANNELS: Route = Route::new(Method::GET, "/guilds/{guild}/channels");
pub const LIST_GUILD_MEMBERS: Route = Route::new(Method::GET, "/guilds/{guild}/members");
pub const GET_GUILD_MEMBER: Route = Route::new(Method::GET, "/guilds/{guild}/members/{user}");
pub const REMOVE_GUILD_MEMBER: Route =
    Route::new(Method::DELETE, "/guilds/{guild}/members/{user}");
pub const ADD_GUILD_MEMBER_ROLE: Route =
    Route::new(Method::PUT, "/guilds/{guild}/members/{user}/roles/{role}");
pub const REMOVE_GUILD_MEMBER_ROLE: Route =
    Route::new(Method::DELETE, "/guilds/{guild}/members/{user}/roles/{role}");
pub const GET_GUILD_ROLES: Route = Route::new(Method::GET, "/guilds/{guild}/roles");
pub const GET_GUILD_BANS: Route = Route::new(Method::GET, "/guilds/{guild}/bans");
pub const CREATE_GUILD_BAN: Route = Route::new(Method::PUT, "/guilds/{guild}/bans/{user}");
pub const REMOVE_GUILD_BAN: Route = Route::new(Method::DELETE, "/guilds/{guild}/bans/{user}");

// =========================================================================
// User
// =========================================================================
pub const GET_CURRENT_USER: Route = Route::new(Method::GET, "/users/@me");
pub const GET_USER: Route = Route::new(Method::GET, "/users/{user}");
pub const GET_CURRENT_USER_GUILDS: Route = Route::new(Method::GET, "/users/@me/guilds");
pub const LEAVE_GUILD: Route = Route::new(Method::DELETE, "/users/@me/guilds/{guild}");
pub const CREATE_DM: Route = Route::new(Method::POST, "/users/@me/channels");

// =========================================================================
// Webhook
// =========================================================================
pub const GET_WEBHOOK: Route = Route::new(Method::GET, "/webhooks/{webhook}");
pub const EXECUTE_WEBHOOK: Route = Route::new(Method::POST, "/webhooks/{webhook}/{token}");
