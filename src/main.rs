use clap::{
    CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};

use spotlyze::{
    cli::{self, FeatureSource},
    config, error,
    types::{RecentPeriod, SeedQueries, TimeRange},
};

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name=env!("CARGO_PKG_NAME"),
  bin_name=env!("CARGO_PKG_NAME"),
  author=env!("CARGO_PKG_AUTHORS"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Authorize with Spotify API
    Auth(AuthOptions),

    /// Remove the stored session
    Logout,

    /// Show whether a valid session is stored
    Status,

    /// Extend the session with the stored refresh token
    Refresh,

    /// Show your Spotify profile
    Profile,

    /// Your most listened artists or tracks
    Top(TopOptions),

    /// Your recently played tracks
    Recent(RecentOptions),

    /// Average audio features of tracks
    Features(FeaturesOptions),

    /// Handle playlists
    Playlist(PlaylistOptions),

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Parser, Debug, Clone)]
pub struct AuthOptions {
    /// Log in again even if a valid session is stored
    #[clap(long)]
    pub force: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct TopOptions {
    #[command(subcommand)]
    pub command: TopSubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum TopSubcommand {
    /// Top artists
    Artists(TopRangeOpts),
    /// Top tracks
    Tracks(TopRangeOpts),
}

#[derive(Parser, Debug, Clone)]
pub struct TopRangeOpts {
    /// Time range to compute the ranking over
    #[clap(long, value_enum, default_value_t = TimeRange::MediumTerm)]
    pub time_range: TimeRange,

    /// Number of entries (1-50)
    #[clap(long, default_value_t = 20)]
    pub limit: u32,
}

#[derive(Parser, Debug, Clone)]
pub struct RecentOptions {
    /// Only show plays from this period
    #[clap(long, value_enum, default_value_t = RecentPeriod::All)]
    pub period: RecentPeriod,

    /// Number of plays to fetch (1-50)
    #[clap(long, default_value_t = 50)]
    pub limit: u32,
}

#[derive(Parser, Debug, Clone)]
#[command(
    about = "Average audio features of tracks",
    group = clap::ArgGroup::new("source").required(true).args(["ids", "playlist", "top"])
)]
pub struct FeaturesOptions {
    /// Spotify track ids
    pub ids: Vec<String>,

    /// Analyze all tracks of a playlist
    #[clap(long)]
    pub playlist: Option<String>,

    /// Analyze your top tracks
    #[clap(long)]
    pub top: bool,

    /// Time range for --top
    #[clap(long, value_enum, default_value_t = TimeRange::MediumTerm)]
    pub time_range: TimeRange,

    /// Number of top tracks for --top (1-50)
    #[clap(long, default_value_t = 50)]
    pub limit: u32,
}

#[derive(Parser, Debug, Clone)]
pub struct PlaylistOptions {
    #[command(subcommand)]
    pub command: PlaylistSubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum PlaylistSubcommand {
    /// Create a playlist of recommendations tuned to your top tracks
    Generate(GenerateOpts),
    /// List your playlists
    List(ListOpts),
}

#[derive(Parser, Debug, Clone)]
pub struct ListOpts {
    /// Number of playlists (1-50)
    #[clap(long, default_value_t = 50)]
    pub limit: u32,
}

#[derive(Parser, Debug, Clone)]
pub struct GenerateOpts {
    /// Playlist name
    #[clap(long)]
    pub name: Option<String>,

    /// Time range of the seed tracks
    #[clap(long, value_enum, default_value_t = TimeRange::ShortTerm)]
    pub time_range: TimeRange,

    /// Number of tracks (1-100)
    #[clap(long, default_value_t = 30)]
    pub limit: u32,

    /// Artist to seed with, found through search (repeatable)
    #[clap(long = "seed-artist")]
    pub seed_artists: Vec<String>,

    /// Track to seed with, found through search (repeatable)
    #[clap(long = "seed-track")]
    pub seed_tracks: Vec<String>,

    /// Genre to seed with, e.g. "house" (repeatable)
    #[clap(long = "seed-genre")]
    pub seed_genres: Vec<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

#[tokio::main]
async fn main() {
    if let Err(e) = config::load_env().await {
        error!("Cannot load environment. Err: {}", e);
    }

    let cli = Cli::parse();

    match cli.command {
        Command::Auth(opt) => cli::auth(opt.force).await,
        Command::Logout => cli::logout().await,
        Command::Status => cli::status().await,
        Command::Refresh => cli::refresh().await,
        Command::Profile => cli::profile().await,
        Command::Top(opt) => match opt.command {
            TopSubcommand::Artists(o) => cli::top_artists(o.time_range, o.limit).await,
            TopSubcommand::Tracks(o) => cli::top_tracks(o.time_range, o.limit).await,
        },
        Command::Recent(opt) => cli::recent(opt.period, opt.limit).await,
        Command::Features(opt) => {
            let source = match (opt.playlist, opt.top) {
                (Some(playlist), _) => FeatureSource::Playlist(playlist),
                (None, true) => FeatureSource::Top(opt.time_range, opt.limit),
                (None, false) => FeatureSource::Tracks(opt.ids),
            };
            cli::features(source).await
        }
        Command::Playlist(opt) => match opt.command {
            PlaylistSubcommand::Generate(g) => {
                let seeds = SeedQueries {
                    artists: g.seed_artists,
                    tracks: g.seed_tracks,
                    genres: g.seed_genres,
                };
                cli::generate(g.name, g.time_range, g.limit, seeds).await
            }
            PlaylistSubcommand::List(l) => cli::list_playlists(l.limit).await,
        },
        Command::Completions(opt) => {
            let mut cmd = Cli::command_for_update();
            let name = cmd.get_name().to_string();
            generate(opt.shell, &mut cmd, name, &mut std::io::stdout())
        }
    }
}
