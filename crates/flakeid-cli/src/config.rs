use core::time::Duration;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use flakeid::{CUSTOM_EPOCH, SnowflakeId, SystemClock};

/// Runtime configuration for the `flakeid-cli` binary.
///
/// Every option can also be supplied through the environment (a `.env` file
/// in the working directory is loaded first).
#[derive(Parser, Debug, Clone)]
#[command(
    name = "flakeid-cli",
    version,
    about = "Issue and decode Snowflake-style 64-bit IDs"
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Node ID of this generator, 0..=1023.
    ///
    /// Must be unique across every process issuing IDs in the same namespace;
    /// allocating it is up to the deployment.
    ///
    /// Environment variable: `NODE_ID`
    #[arg(long, env = "NODE_ID", allow_negative_numbers = true)]
    pub node_id: Option<i64>,

    /// Number of IDs to issue.
    ///
    /// Environment variable: `ID_COUNT`
    #[arg(short = 'n', long, env = "ID_COUNT", default_value_t = 1)]
    pub count: usize,

    /// Epoch of the timestamp field, in milliseconds since 1970-01-01 UTC.
    ///
    /// Every node in a fleet must agree on this value. It may not be later
    /// than the current time.
    ///
    /// Environment variable: `EPOCH_MILLIS`
    #[arg(long, env = "EPOCH_MILLIS", default_value_t = default_epoch_millis())]
    pub epoch_millis: u64,

    /// Generator implementation.
    ///
    /// Environment variable: `GENERATOR`
    #[arg(long, env = "GENERATOR", value_enum, default_value_t = GeneratorKind::Lock)]
    pub generator: GeneratorKind,

    /// How each ID is written to stdout.
    ///
    /// Environment variable: `OUTPUT_FORMAT`
    #[arg(long, env = "OUTPUT_FORMAT", value_enum, default_value_t = OutputFormat::Decimal)]
    pub format: OutputFormat,

    /// Number of threads issuing IDs concurrently from the one generator.
    ///
    /// Environment variable: `THREADS`
    #[arg(long, env = "THREADS", default_value_t = 1)]
    pub threads: usize,

    /// Longest clock rollback, in milliseconds, to wait out before giving up.
    ///
    /// Environment variable: `MAX_ROLLBACK_WAIT_MS`
    #[arg(long, env = "MAX_ROLLBACK_WAIT_MS", default_value_t = 1_000)]
    pub max_rollback_wait_ms: u64,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Decode an ID into its fields and print them as JSON.
    Decode {
        /// The ID, in decimal.
        id: String,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorKind {
    /// Single mutex around the generation state.
    Lock,
    /// Lock-free compare-and-swap.
    Atomic,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Plain decimal integer.
    Decimal,
    /// 20-digit zero-padded decimal, sortable as text.
    Padded,
    /// One JSON object per line with the decoded fields.
    Json,
}

#[allow(clippy::cast_possible_truncation)]
const fn default_epoch_millis() -> u64 {
    CUSTOM_EPOCH.as_millis() as u64
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateConfig {
    /// Range-checked when the generator is built.
    pub node_id: i64,
    pub count: usize,
    pub clock: SystemClock,
    pub generator: GeneratorKind,
    pub format: OutputFormat,
    pub threads: usize,
    pub max_rollback_wait: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Config {
    Generate(GenerateConfig),
    Decode { id: SnowflakeId, epoch: Duration },
}

impl TryFrom<CliArgs> for Config {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let clock = SystemClock::with_epoch(Duration::from_millis(args.epoch_millis))
            .context("EPOCH_MILLIS is not usable")?;

        if let Some(Command::Decode { id }) = args.command {
            let id = id
                .parse::<SnowflakeId>()
                .with_context(|| format!("cannot decode {id:?}"))?;
            return Ok(Self::Decode {
                id,
                epoch: clock.epoch(),
            });
        }

        let Some(node_id) = args.node_id else {
            bail!("NODE_ID is required to issue IDs");
        };

        if args.threads == 0 {
            bail!("THREADS must be greater than 0");
        }

        Ok(Self::Generate(GenerateConfig {
            node_id,
            count: args.count,
            clock,
            generator: args.generator,
            format: args.format,
            threads: args.threads,
            max_rollback_wait: Duration::from_millis(args.max_rollback_wait_ms),
        }))
    }
}
