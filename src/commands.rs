use std::collections::HashMap;

use chrono::DateTime;
use diesel::SqliteConnection;
use url::Url;

use crate::aggregator::{self, CancelToken};
use crate::config::Config;
use crate::errors::AppError;
use crate::models::feed::Feed;
use crate::models::feed_follow::FeedFollow;
use crate::models::post::Post;
use crate::models::user::User;
use crate::reader::HttpFetcher;

const DEFAULT_BROWSE_LIMIT: i64 = 2;

/// Everything a handler needs, passed explicitly. Handlers never reach for
/// process-wide state.
pub struct State {
    pub config: Config,
    pub conn: SqliteConnection,
}

#[derive(Debug, Clone)]
pub struct Command {
    pub name: String,
    pub args: Vec<String>,
}

pub type CommandHandler = Box<dyn Fn(&mut State, &Command) -> Result<(), AppError>>;

/// Name-to-handler mapping, built once at startup.
#[derive(Default)]
pub struct CommandRegistry {
    handlers: HashMap<String, CommandHandler>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: &str, handler: F) -> Result<(), AppError>
    where
        F: Fn(&mut State, &Command) -> Result<(), AppError> + 'static,
    {
        if self.handlers.contains_key(name) {
            return Err(AppError::Usage(format!("command '{name}' already registered")));
        }
        self.handlers.insert(name.to_string(), Box::new(handler));
        Ok(())
    }

    pub fn run(&self, state: &mut State, command: &Command) -> Result<(), AppError> {
        let handler = self
            .handlers
            .get(&command.name)
            .ok_or_else(|| AppError::Usage(format!("command '{}' not registered", command.name)))?;
        handler(state, command).map_err(|e| AppError::Command {
            name: command.name.clone(),
            source: Box::new(e),
        })
    }
}

/// Wrap a handler that needs the logged-in user. The user is resolved from
/// config before the inner handler runs; resolution failure propagates and
/// the inner handler is never invoked.
pub fn logged_in<F>(handler: F) -> impl Fn(&mut State, &Command) -> Result<(), AppError>
where
    F: Fn(&mut State, &Command, &User) -> Result<(), AppError>,
{
    move |state: &mut State, command: &Command| {
        let name = state
            .config
            .current_user_name
            .clone()
            .ok_or_else(|| AppError::NotFound("no user is logged in".to_string()))?;
        let user = User::get_by_name(&mut state.conn, &name)?;
        handler(state, command, &user)
    }
}

/// The full command set, wired the same way for the binary and for tests.
pub fn default_registry() -> Result<CommandRegistry, AppError> {
    let mut registry = CommandRegistry::new();
    registry.register("login", login)?;
    registry.register("register", register)?;
    registry.register("users", users)?;
    registry.register("reset", reset)?;
    registry.register("agg", agg)?;
    registry.register("addfeed", logged_in(add_feed))?;
    registry.register("delfeed", del_feed)?;
    registry.register("feeds", feeds)?;
    registry.register("follow", logged_in(follow))?;
    registry.register("following", logged_in(following))?;
    registry.register("unfollow", logged_in(unfollow))?;
    registry.register("browse", logged_in(browse))?;
    Ok(registry)
}

fn expect_args(command: &Command, count: usize, usage: &str) -> Result<(), AppError> {
    if command.args.len() != count {
        return Err(AppError::Usage(format!("usage: {usage}")));
    }
    Ok(())
}

fn login(state: &mut State, command: &Command) -> Result<(), AppError> {
    expect_args(command, 1, "login <name>")?;
    let name = &command.args[0];
    User::get_by_name(&mut state.conn, name)?;
    state.config.set_user(name)?;
    log::info!("logged in as '{name}'");
    Ok(())
}

fn register(state: &mut State, command: &Command) -> Result<(), AppError> {
    expect_args(command, 1, "register <name>")?;
    let name = &command.args[0];
    let user = User::create(&mut state.conn, name)?;
    state.config.set_user(name)?;
    log::info!("registered '{}' (id {})", user.name, user.id);
    Ok(())
}

fn users(state: &mut State, command: &Command) -> Result<(), AppError> {
    expect_args(command, 0, "users")?;
    let all = User::get_all(&mut state.conn)?;
    let current = state.config.current_user_name.as_deref();
    for user in &all {
        if Some(user.name.as_str()) == current {
            println!("* {} (current)", user.name);
        } else {
            println!("* {}", user.name);
        }
    }
    log::info!("{} users", all.len());
    Ok(())
}

fn reset(state: &mut State, command: &Command) -> Result<(), AppError> {
    expect_args(command, 0, "reset")?;
    let deleted = User::delete_all(&mut state.conn)?;
    log::info!("reset: {deleted} users deleted");
    Ok(())
}

fn agg(state: &mut State, command: &Command) -> Result<(), AppError> {
    expect_args(command, 1, "agg <interval>")?;
    let interval = aggregator::parse_duration(&command.args[0])?;
    let fetcher = HttpFetcher::new()?;
    let cancel = CancelToken::new();
    aggregator::run(
        &mut state.conn,
        &fetcher,
        interval,
        state.config.duplicate_posts,
        &cancel,
    )
}

fn add_feed(state: &mut State, command: &Command, user: &User) -> Result<(), AppError> {
    expect_args(command, 2, "addfeed <name> <url>")?;
    let (name, url) = (&command.args[0], &command.args[1]);
    Url::parse(url).map_err(|e| AppError::Usage(format!("invalid feed url '{url}': {e}")))?;
    let feed = Feed::create(&mut state.conn, name, url, user.id)?;
    FeedFollow::create(&mut state.conn, user.id, feed.id)?;
    println!("{} ({})", feed.name, feed.url);
    log::info!("'{}' added feed '{}' ({})", user.name, feed.name, feed.url);
    Ok(())
}

fn del_feed(state: &mut State, command: &Command) -> Result<(), AppError> {
    expect_args(command, 1, "delfeed <url>")?;
    let url = &command.args[0];
    Feed::delete_by_url(&mut state.conn, url)?;
    log::info!("deleted feed '{url}'");
    Ok(())
}

fn feeds(state: &mut State, command: &Command) -> Result<(), AppError> {
    expect_args(command, 0, "feeds")?;
    let all = Feed::get_all_with_owner(&mut state.conn)?;
    for (feed, owner) in &all {
        println!("* {} ({}) from {}", feed.name, feed.url, owner);
    }
    log::info!("{} feeds", all.len());
    Ok(())
}

fn follow(state: &mut State, command: &Command, user: &User) -> Result<(), AppError> {
    expect_args(command, 1, "follow <url>")?;
    let feed = Feed::get_by_url(&mut state.conn, &command.args[0])?;
    FeedFollow::create(&mut state.conn, user.id, feed.id)?;
    log::info!("'{}' followed '{}'", user.name, feed.name);
    Ok(())
}

fn following(state: &mut State, command: &Command, user: &User) -> Result<(), AppError> {
    expect_args(command, 0, "following")?;
    let followed = FeedFollow::feeds_for_user(&mut state.conn, user.id)?;
    for feed in &followed {
        println!("* {}", feed.name);
    }
    log::info!("'{}' follows {} feeds", user.name, followed.len());
    Ok(())
}

fn unfollow(state: &mut State, command: &Command, user: &User) -> Result<(), AppError> {
    expect_args(command, 1, "unfollow <url>")?;
    let feed = Feed::get_by_url(&mut state.conn, &command.args[0])?;
    FeedFollow::delete(&mut state.conn, user.id, feed.id)?;
    log::info!("'{}' unfollowed '{}'", user.name, feed.name);
    Ok(())
}

fn browse(state: &mut State, command: &Command, user: &User) -> Result<(), AppError> {
    if command.args.len() > 1 {
        return Err(AppError::Usage("usage: browse [limit]".to_string()));
    }
    let limit = match command.args.first() {
        Some(raw) => raw
            .parse::<i64>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| AppError::Usage(format!("invalid limit '{raw}'")))?,
        None => DEFAULT_BROWSE_LIMIT,
    };
    let posts = Post::for_user(&mut state.conn, user.id, limit)?;
    for post in &posts {
        println!("{} ({})", post.title, format_published(post.published_at));
        println!("-----------------------------------------");
        println!("{}", post.description.as_deref().unwrap_or(""));
        println!("=========================================");
    }
    Ok(())
}

fn format_published(epoch: i32) -> String {
    DateTime::from_timestamp(epoch as i64, 0)
        .map(|date| date.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| epoch.to_string())
}
