use crate::{
    arith::{Arith, ArithArgs},
    config::{DEFAULT_LISTEN, init_config},
};
use clap::{Args, Parser};
use ripple_rpc::{
    Client, Server,
    codec::{CodecRegistry, CodecType},
};
use tokio::net::{TcpListener, TcpStream};
use tracing::info;

/// Arith over ripple-rpc.
#[derive(Parser)]
#[command(version)]
pub enum Cli {
    /// Serve the Arith service over TCP.
    Serve(ServeArgs),
    /// Make a single Arith call and print the reply.
    Call(CallArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// Overrides `listen` from the config.
    #[arg(long)]
    pub addr: Option<String>,
    #[arg(long)]
    pub config: Option<String>,
}

#[derive(Args)]
pub struct CallArgs {
    #[arg(long, default_value = DEFAULT_LISTEN)]
    pub addr: String,
    #[arg(long, default_value = "application/gob")]
    pub codec: CodecType,
    /// e.g. Arith.Add
    pub method: String,
    #[arg(allow_hyphen_values = true)]
    pub a: i64,
    #[arg(allow_hyphen_values = true)]
    pub b: i64,
}

pub async fn run_cli() -> anyhow::Result<()> {
    match Cli::parse() {
        Cli::Serve(args) => serve(args).await,
        Cli::Call(args) => {
            let reply = call(&args).await?;
            println!("{reply}");
            Ok(())
        }
    }
}

pub async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = init_config(args.config.as_deref())?;
    if let Some(addr) = args.addr {
        config.listen = addr;
    }
    let registry = config.registry()?;

    let listener = TcpListener::bind(&config.listen).await?;
    info!(
        listen = %listener.local_addr()?,
        codecs = ?registry.codec_types().collect::<Vec<_>>(),
        "start server"
    );

    Server::new(Arith)
        .with_registry(registry)
        .accept(listener)
        .await?;
    Ok(())
}

pub async fn call(args: &CallArgs) -> anyhow::Result<i64> {
    let conn = TcpStream::connect(&args.addr).await?;
    let mut client = Client::connect(conn, args.codec.clone(), &CodecRegistry::default()).await?;

    let reply = client
        .call(&args.method, &ArithArgs::new(args.a, args.b))
        .await?;
    client.close().await?;
    Ok(reply)
}
