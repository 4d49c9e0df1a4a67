use rust_ltfs_admin::cli::{Cli, Commands};
use rust_ltfs_admin::commands::{self, Context};
use rust_ltfs_admin::error::Result;
use rust_ltfs_admin::{logger, Config};
use tracing::{debug, error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse_args();

    // Initialize logging system
    logger::init(args.verbose, args.log_json)?;

    debug!("ltfsadm starting");

    match run(args).await {
        Ok(_) => {
            info!("Operation completed successfully");
            Ok(())
        }
        Err(e) => {
            error!("Operation failed: {}", e);
            std::process::exit(1);
        }
    }
}

async fn run(args: Cli) -> Result<()> {
    let config = Config::load(args.config.as_deref())?;
    let ctx = Context::new(config);

    match args.command {
        Commands::List { detailed, json } => commands::list::execute(&ctx, detailed, json).await,

        Commands::Select { target } => commands::list::select(&ctx, &target).await,

        Commands::Info { target } => commands::drive::info(&ctx, &target).await,

        Commands::Mt { target, operation } => commands::drive::mt(&ctx, &target, operation).await,

        Commands::Eject { target } => commands::drive::eject(&ctx, &target).await,

        Commands::Mount {
            target,
            mount_point,
            options,
        } => commands::mount::mount(&ctx, &target, mount_point, options).await,

        Commands::Unmount { mount_point } => commands::mount::unmount(&ctx, mount_point).await,

        Commands::Mounts => commands::mount::list_mounts(&ctx).await,

        Commands::Format {
            target,
            label,
            force,
            block_size,
            yes,
        } => commands::format::execute(&ctx, &target, label, force, block_size, yes).await,

        Commands::Diag {
            target,
            suite,
            allow_write,
            output,
        } => commands::diag::execute(&ctx, &target, suite, allow_write, output).await,

        Commands::Mam { target, action } => commands::mam::execute(&ctx, &target, action).await,

        Commands::Status => commands::status::execute(&ctx).await,
    }
}
