//! Configuration for running this bot.

use std::collections::HashSet;
use std::time::Duration;

use poise::Framework;
use serde::Deserialize;
use serde::Serialize;
use serenity::GuildId;
use serenity::UserId;

use crate::error::ConfigError;
use crate::player::PlayerSettings;
use crate::serenity;

/// The path to the config file
const CONFIG_PATH: &str = "config.toml";

/// Settings read from [CONFIG_PATH] that modify bot behavior.
#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    /// Token needed to use a bot account.
    discord_token: String,

    /// Prefix of text commands, e.g. `!play`.
    prefix: String,

    /// See [LoggingConfig]
    logging: LoggingConfig,

    /// See [PlayerConfig]
    player: PlayerConfig,

    /// Useful developer specific configs.
    dev_utils: DevConfig,
}

impl Config {
    /// Tries to read [CONFIG_PATH] to extract a [Config].
    /// If a file doesn't exists, create the default config file and returns error.
    /// If a file exists but is empty, re-write the default values and return error.
    /// If a file exists but is incomplete, show error and don't change files.
    /// If a file exists and is complete, read file to create a config.
    /// If file existance is indeterminent (e.g. missing permissions), return error.
    pub fn read() -> Result<Config, ConfigError> {
        let file = std::fs::read_to_string(CONFIG_PATH);

        match file {
            // Config file found
            Ok(content) => {
                // Write default values to file if it's empty.
                if content.trim().is_empty() {
                    write_file(Config::default())?;
                    Err(ConfigError::InvalidConfig {
                        reason: format!("Empty config file! Rewriting {CONFIG_PATH} ..."),
                    })
                } else {
                    Config::parse(&content)
                }
            }
            // File not found or other filesystem error
            Err(file_error) => {
                match file_error.kind() {
                    // If file doesn't exist, create default config file.
                    std::io::ErrorKind::NotFound => {
                        let action = format!("Creating {CONFIG_PATH}...");
                        write_file(Config::default())?;
                        Err(ConfigError::MissingConfig { action_msg: action })
                    }
                    _ => Err(ConfigError::IoError(file_error)),
                }
            }
        }
    }

    /// Deserialize and validate the content of a config file.
    fn parse(content: &str) -> Result<Config, ConfigError> {
        // If deserialization fails, return error describing the mistake.
        let to_toml = toml::Deserializer::new(content);
        let config: Config = serde_path_to_error::deserialize(to_toml).map_err(|error| {
            ConfigError::InvalidConfig {
                reason: error.to_string(),
            }
        })?;

        config.player.validate()?;
        Ok(config)
    }

    /// Basic sanity check for if a token was given.
    pub fn token(&self) -> Result<&String, ConfigError> {
        let default_token = Config::default().discord_token;
        let given_token = &self.discord_token;

        let is_empty = given_token.trim().is_empty();
        let contains_default = given_token.contains(&default_token);

        if !is_empty && !contains_default {
            Ok(&self.discord_token)
        } else {
            Err(ConfigError::InvalidConfig {
                reason: "Missing discord token".to_string(),
            })
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Construct a bug notification notify list based on the config.
    /// Wrapper for [NotifyConfig::notify_list]
    pub fn notify_list<U, E>(&self, fw: &Framework<U, E>) -> HashSet<UserId> {
        self.dev_utils.notifications.notify_list(fw)
    }

    /// Getter for log_dir.
    pub fn log_dir(&self) -> &str {
        &self.logging.log_dir
    }

    /// Is debug mode enabled for console logs
    pub fn console_debug(&self) -> bool {
        self.logging.console_debug
    }

    /// Is file logging enabled.
    pub fn logs_enabled(&self) -> bool {
        self.logging.logs_enabled
    }

    pub fn dev_guild(&self) -> Option<GuildId> {
        self.dev_utils.dev_guild
    }

    /// The yt-dlp executable to resolve tracks with.
    pub fn ytdlp_path(&self) -> &str {
        &self.player.ytdlp_path
    }

    /// Settings given to every playback session.
    pub fn player_settings(&self) -> PlayerSettings {
        let player = &self.player;
        PlayerSettings {
            idle_timeout: Duration::from_secs(player.idle_timeout_secs),
            skip_threshold: player.skip_votes_needed,
            default_volume: player.default_volume as f32 / 100.0,
            page_size: player.queue_page_size,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            discord_token: "put_token_here".to_string(),
            prefix: "!".to_string(),

            logging: LoggingConfig {
                console_debug: false,
                logs_enabled: true,
                log_dir: "logs".to_string(),
            },

            player: PlayerConfig {
                ytdlp_path: "yt-dlp".to_string(),
                idle_timeout_secs: 180,
                skip_votes_needed: 3,
                default_volume: 50,
                queue_page_size: 10,
            },

            dev_utils: DevConfig {
                dev_guild: None,
                notifications: NotifyConfig {
                    enabled: false,
                    add_owners: true,
                    userids: vec![],
                },
            },
        }
    }
}

/// Configs for
#[derive(Debug, Serialize, Deserialize)]
struct LoggingConfig {
    /// Print debug traces to console?
    console_debug: bool,
    /// Enable writing to log file?
    logs_enabled: bool,
    /// Directory to store log files
    log_dir: String,
}

/// Configs for audio playback.
#[derive(Debug, Serialize, Deserialize)]
struct PlayerConfig {
    /// Path or name of the yt-dlp executable.
    ytdlp_path: String,
    /// Seconds to wait for a new track before leaving voice.
    idle_timeout_secs: u64,
    /// Votes needed to skip a track someone else requested.
    skip_votes_needed: usize,
    /// Volume of new sessions in percent.
    default_volume: u8,
    /// Tracks shown per page of `/queue`.
    queue_page_size: usize,
}

impl PlayerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: &str| {
            Err(ConfigError::InvalidConfig {
                reason: format!("player.{reason}"),
            })
        };

        if self.ytdlp_path.trim().is_empty() {
            return invalid("ytdlp_path can't be empty");
        }
        if self.idle_timeout_secs == 0 {
            return invalid("idle_timeout_secs must be positive");
        }
        if self.skip_votes_needed == 0 {
            return invalid("skip_votes_needed must be positive");
        }
        if self.default_volume > 100 {
            return invalid("default_volume must be between 0 and 100");
        }
        if self.queue_page_size == 0 {
            return invalid("queue_page_size must be positive");
        }
        Ok(())
    }
}

/// Optional configs to enable developer-specific behavior.
#[derive(Debug, Serialize, Deserialize)]
struct DevConfig {
    /// Optional guild to automatically update commands quickly.
    #[serde(serialize_with = "serialize_opt", deserialize_with = "deserialize_opt")]
    dev_guild: Option<GuildId>,
    /// See [NotifyConfig]
    notifications: NotifyConfig,
}

/// Configs for notification behavior when encountering unexpected errors.
#[derive(Debug, Serialize, Deserialize)]
struct NotifyConfig {
    /// Enable this behavior or not. (bot sends a private message)
    enabled: bool,
    /// Whether to automatically add owners to the notify list.
    add_owners: bool,
    /// Additional users to add to the notify list.
    userids: Vec<UserId>,
}

impl NotifyConfig {
    /// Construct a bug notification notify list based on the config.
    fn notify_list<U, E>(&self, fw: &Framework<U, E>) -> HashSet<UserId> {
        let mut notify_list = HashSet::new();

        // If disabled, don't add anyone to the list.
        if !self.enabled {
            return notify_list;
        }

        // Add bot owners if enabled
        if self.add_owners {
            notify_list.extend(fw.options().owners.iter().copied());
        }

        // Add users in config
        notify_list.extend(self.userids.iter().copied());
        notify_list
    }
}

/// Write the given config to [CONFIG_PATH].
fn write_file(config: Config) -> Result<(), ConfigError> {
    let content =
        toml::to_string_pretty(&config).map_err(|error| ConfigError::InvalidConfig {
            reason: error.to_string(),
        })?;
    std::fs::write(CONFIG_PATH, content).map_err(ConfigError::IoError)
}

fn deserialize_opt<'de, D>(deserializer: D) -> Result<Option<GuildId>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    deserializer.deserialize_str(OptVisitor)
}

fn serialize_opt<T, S>(val: &Option<T>, ser: S) -> Result<S::Ok, S::Error>
where
    T: serde::Serialize,
    S: serde::Serializer,
{
    match val {
        Some(v) => v.serialize(ser),
        None => ser.serialize_str(""),
    }
}

struct OptVisitor;

impl<'de> serde::de::Visitor<'de> for OptVisitor {
    type Value = Option<GuildId>;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a valid guild id")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        match v {
            "" => Ok(None),
            _ => {
                let num: u64 = v.parse().map_err(|_| E::custom("not u64"))?;
                if num == 0 {
                    return Err(E::custom("guild id can't be 0"));
                }
                Ok(Some(GuildId::new(num)))
            }
        }
    }
}
