//! Sample TCP endpoints and proxies for the yrgourd protocol.
//!
//! `echo`, `connect`, `stream`, and `sink` are plaintext endpoints meant to
//! sit behind the proxies: `proxy` accepts plaintext clients and relays them
//! over encrypted connections, `reverse-proxy` accepts encrypted clients and
//! relays them to a plaintext server. None of this is part of the interop
//! contract; it exists to exercise the protocol over real sockets.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rand_core::OsRng;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use yrgourd::{allow_all, initiate, respond, Connection, KeyPair, PublicKey, StaticSecret};

#[derive(Parser, Debug)]
#[command(name = "yrgourd", version, about = "Encrypted TCP tunnels and test endpoints")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a static key pair and print it hex-encoded.
    GenerateKey,
    /// Run a plaintext echo server.
    Echo(EchoArgs),
    /// Run a plaintext client connecting stdin/stdout to a server.
    Connect(ConnectArgs),
    /// Accept plaintext clients and relay them over encrypted connections.
    Proxy(ProxyArgs),
    /// Accept encrypted clients and relay them to a plaintext server.
    ReverseProxy(ReverseProxyArgs),
    /// Connect to a server and write a fixed number of bytes.
    Stream(StreamArgs),
    /// Accept connections and discard everything read, reporting throughput.
    Sink(SinkArgs),
}

#[derive(Args, Debug)]
struct EchoArgs {
    /// The address to listen on.
    #[arg(long, default_value = "127.0.0.1:4040")]
    addr: String,
}

#[derive(Args, Debug)]
struct ConnectArgs {
    /// The address to connect to.
    #[arg(long, default_value = "127.0.0.1:4040")]
    addr: String,
}

#[derive(Args, Debug, Clone)]
struct ProxyArgs {
    /// The address to listen on for plaintext clients.
    #[arg(long, default_value = "127.0.0.1:6060")]
    listen: String,

    /// The encrypted server address to connect to.
    #[arg(long, default_value = "127.0.0.1:5050")]
    connect: String,

    /// The client's hex-encoded private key.
    #[arg(long)]
    client_key: StaticSecret,

    /// The server's hex-encoded public key.
    #[arg(long)]
    server_key: PublicKey,
}

#[derive(Args, Debug, Clone)]
struct ReverseProxyArgs {
    /// The address to listen on for encrypted clients.
    #[arg(long, default_value = "127.0.0.1:5050")]
    listen: String,

    /// The plaintext server address to connect to.
    #[arg(long, default_value = "127.0.0.1:4040")]
    connect: String,

    /// The server's hex-encoded private key.
    #[arg(long)]
    server_key: StaticSecret,
}

#[derive(Args, Debug)]
struct StreamArgs {
    /// The address to connect to.
    #[arg(long, default_value = "127.0.0.1:4040")]
    addr: String,

    /// The number of bytes to write.
    #[arg(long, default_value_t = 1024 * 1024 * 1024)]
    size: u64,
}

#[derive(Args, Debug)]
struct SinkArgs {
    /// The address to listen on.
    #[arg(long, default_value = "127.0.0.1:4040")]
    addr: String,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Command::GenerateKey => generate_key(),
        Command::Echo(args) => echo(args),
        Command::Connect(args) => connect(args),
        Command::Proxy(args) => proxy(args),
        Command::ReverseProxy(args) => reverse_proxy(args),
        Command::Stream(args) => stream(args),
        Command::Sink(args) => sink(args),
    }
}

fn generate_key() -> Result<()> {
    let pair = KeyPair::generate(&mut OsRng);
    println!("private key: {}", pair.secret.to_hex());
    println!("public key: {}", pair.public);
    Ok(())
}

fn echo(args: EchoArgs) -> Result<()> {
    let listener = TcpListener::bind(&args.addr)
        .with_context(|| format!("failed to listen on {}", args.addr))?;
    info!(addr = %listener.local_addr()?, "listening");

    for conn in listener.incoming() {
        let conn = match conn {
            Ok(conn) => conn,
            Err(err) => {
                warn!(%err, "failed to accept connection");
                continue;
            }
        };
        thread::spawn(move || {
            info!("accepted new connection");
            if let Err(err) = echo_conn(conn) {
                error!(%err, "connection failed");
            }
            info!("closed connection");
        });
    }
    Ok(())
}

fn echo_conn(mut conn: TcpStream) -> io::Result<()> {
    let mut buf = [0u8; 1024];
    loop {
        let n = conn.read(&mut buf)?;
        if n == 0 {
            return Ok(());
        }
        conn.write_all(&buf[..n])?;
    }
}

fn connect(args: ConnectArgs) -> Result<()> {
    info!(addr = %args.addr, "connecting");
    let conn = TcpStream::connect(&args.addr)
        .with_context(|| format!("failed to connect to {}", args.addr))?;

    let (done_tx, done_rx) = mpsc::channel();
    {
        let done = done_tx.clone();
        let mut conn = conn.try_clone()?;
        thread::spawn(move || {
            if let Err(err) = io::copy(&mut io::stdin().lock(), &mut conn) {
                error!(%err, "error reading from stdin");
            }
            let _ = done.send(());
        });
    }
    {
        let mut conn = conn;
        thread::spawn(move || {
            if let Err(err) = io::copy(&mut conn, &mut io::stdout()) {
                error!(%err, "error writing to stdout");
            }
            let _ = done_tx.send(());
        });
    }
    let _ = done_rx.recv();
    Ok(())
}

fn proxy(args: ProxyArgs) -> Result<()> {
    let listener = TcpListener::bind(&args.listen)
        .with_context(|| format!("failed to listen on {}", args.listen))?;
    info!(addr = %listener.local_addr()?, "listening");

    for conn in listener.incoming() {
        let conn = match conn {
            Ok(conn) => conn,
            Err(err) => {
                warn!(%err, "failed to accept connection");
                continue;
            }
        };
        let args = args.clone();
        thread::spawn(move || {
            info!("accepted new connection");
            if let Err(err) = proxy_conn(conn, &args) {
                error!(%err, "proxy connection failed");
            }
            info!("closed connection");
        });
    }
    Ok(())
}

fn proxy_conn(plain: TcpStream, args: &ProxyArgs) -> Result<()> {
    info!(addr = %args.connect, "connecting");
    let server = TcpStream::connect(&args.connect)
        .with_context(|| format!("failed to connect to {}", args.connect))?;
    let secured = initiate(server, &args.client_key, &args.server_key, None)
        .context("handshake failed")?;
    relay(plain, secured)
}

fn reverse_proxy(args: ReverseProxyArgs) -> Result<()> {
    let listener = TcpListener::bind(&args.listen)
        .with_context(|| format!("failed to listen on {}", args.listen))?;
    info!(addr = %listener.local_addr()?, "listening");

    for conn in listener.incoming() {
        let conn = match conn {
            Ok(conn) => conn,
            Err(err) => {
                warn!(%err, "failed to accept connection");
                continue;
            }
        };
        let args = args.clone();
        thread::spawn(move || {
            if let Err(err) = reverse_proxy_conn(conn, &args) {
                error!(%err, "proxy connection failed");
            }
            info!("closed connection");
        });
    }
    Ok(())
}

fn reverse_proxy_conn(conn: TcpStream, args: &ReverseProxyArgs) -> Result<()> {
    let secured =
        respond(conn, &args.server_key, None, allow_all).context("handshake failed")?;
    info!("accepted new connection");

    info!(addr = %args.connect, "connecting");
    let plain = TcpStream::connect(&args.connect)
        .with_context(|| format!("failed to connect to {}", args.connect))?;
    relay(plain, secured)
}

/// Pump bytes both ways between a plaintext socket and an encrypted
/// connection until either direction ends, then shut both down.
fn relay(plain: TcpStream, secured: Connection<TcpStream>) -> Result<()> {
    let plain_ctl = plain.try_clone()?;
    let secured_ctl = secured.get_ref().try_clone()?;
    let shutdown = move || {
        let _ = plain_ctl.shutdown(Shutdown::Both);
        let _ = secured_ctl.shutdown(Shutdown::Both);
    };

    let mut plain_reader = plain.try_clone()?;
    let mut plain_writer = plain;
    let (mut secured_reader, mut secured_writer) = secured.into_split()?;

    thread::scope(|s| {
        let shutdown = &shutdown;
        s.spawn(move || {
            let _ = io::copy(&mut plain_reader, &mut secured_writer);
            shutdown();
        });
        let _ = io::copy(&mut secured_reader, &mut plain_writer);
        shutdown();
    });
    Ok(())
}

fn stream(args: StreamArgs) -> Result<()> {
    info!(addr = %args.addr, "connecting");
    let mut conn = TcpStream::connect(&args.addr)
        .with_context(|| format!("failed to connect to {}", args.addr))?;

    let mut source = io::repeat(0x22).take(args.size);
    let n = io::copy(&mut source, &mut conn).context("error writing data")?;
    info!(bytes = n, "stream complete");
    Ok(())
}

fn sink(args: SinkArgs) -> Result<()> {
    let listener = TcpListener::bind(&args.addr)
        .with_context(|| format!("failed to listen on {}", args.addr))?;
    info!(addr = %listener.local_addr()?, "listening");

    for conn in listener.incoming() {
        let mut conn = match conn {
            Ok(conn) => conn,
            Err(err) => {
                warn!(%err, "failed to accept connection");
                continue;
            }
        };
        thread::spawn(move || {
            info!("accepted new connection");
            let start = Instant::now();
            match io::copy(&mut conn, &mut io::sink()) {
                Ok(n) => {
                    let elapsed = start.elapsed();
                    let rate = n as f64 / 1024.0 / 1024.0 / elapsed.as_secs_f64();
                    info!(bytes = n, ?elapsed, "read {rate:.2} MiB/s");
                }
                Err(err) => error!(%err, "error reading data"),
            }
            info!("closed connection");
        });
    }
    Ok(())
}
