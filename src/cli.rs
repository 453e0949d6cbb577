use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sous")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Resolve and converge declarative resources on this host", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Report what would change without changing anything
    #[arg(long, global = true, env = "SOUS_WHY_RUN")]
    pub why_run: bool,

    /// Treat deprecation warnings as errors
    #[arg(long, global = true)]
    pub strict: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show which resource and provider a DSL name resolves to
    Resolve(ResolveArgs),

    /// Declare one resource and converge it
    Apply(ApplyArgs),

    /// List registered DSL names and their candidates
    List {
        /// List provider registrations instead of resources
        #[arg(short, long)]
        providers: bool,
    },

    /// Show the node attributes used for resolution
    Node(NodeArgs),

    /// Show the effective configuration
    Config,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Arguments
// ============================================================================

#[derive(Args)]
pub struct NodeArgs {
    /// Read node attributes from a JSON or TOML file instead of detecting them
    #[arg(short, long, value_name = "FILE")]
    pub node: Option<PathBuf>,
}

#[derive(Args)]
pub struct ResolveArgs {
    /// DSL name, e.g. `package`
    pub dsl_name: String,

    /// Action to resolve a provider for (defaults to the resource's default action)
    #[arg(short, long)]
    pub action: Option<String>,

    /// Resource name used for provider resolution
    #[arg(long, default_value = "example")]
    pub name: String,

    #[command(flatten)]
    pub node: NodeArgs,
}

#[derive(Args)]
pub struct ApplyArgs {
    /// DSL name, e.g. `package`
    pub dsl_name: String,

    /// Resource name, e.g. `git`
    pub name: String,

    /// Actions to run, in order (defaults to the resource's default action)
    #[arg(short, long)]
    pub action: Vec<String>,

    /// Attribute assignment, repeatable
    #[arg(short, long, value_name = "ATTR=VALUE")]
    pub set: Vec<String>,

    #[command(flatten)]
    pub node: NodeArgs,
}
