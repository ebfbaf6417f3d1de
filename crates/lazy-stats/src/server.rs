//! TCP listener
//!
//! Accepts connections on the smol executor, one task per connection,
//! one request per connection.

use crate::http::{Response, read_request};
use crate::service::StatService;
use crate::{ServerConfig, ServerError};
use smol::io::{AsyncReadExt, BufReader};
use smol::net::{TcpListener, TcpStream};
use smol::Timer;
use std::net::{Shutdown, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

/// Default time a client gets to send its full request
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Pause after a failed `accept` before trying again
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// How long unread input is drained after rejecting a request
const LINGER: Duration = Duration::from_secs(1);

/// Most bytes drained after rejecting a request
const LINGER_BYTES: usize = 64 * 1024;

/// Stat counter server
pub struct StatServer {
    /// Bound listener
    listener: TcpListener,
    /// Shared request handler
    service: Arc<StatService>,
    /// Local address
    local_addr: SocketAddr,
    /// Deadline for reading one request
    read_timeout: Duration,
}

impl StatServer {
    /// Bind the configured address and prepare the store
    pub async fn bind(config: &ServerConfig) -> Result<Self, ServerError> {
        let service = StatService::bootstrap(&config.stats_dir, &config.static_root).await?;
        let server = Self::bind_with(&config.bind_addr(), service).await?;
        Ok(server.with_read_timeout(Duration::from_millis(config.read_timeout_ms)))
    }

    /// Bind an explicit address around an existing service
    pub async fn bind_with(addr: &str, service: StatService) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!("Server is running on {}", local_addr);
        Ok(Self {
            listener,
            service: Arc::new(service),
            local_addr,
            read_timeout: DEFAULT_READ_TIMEOUT,
        })
    }

    /// Set how long a client may take to send its request
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Get local address
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn service(&self) -> &StatService {
        &self.service
    }

    /// Accept connections forever; accept errors are logged and retried
    pub async fn run(self) -> Result<(), ServerError> {
        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    tracing::warn!("accept failed: {}", e);
                    Timer::after(ACCEPT_BACKOFF).await;
                    continue;
                }
            };
            let service = self.service.clone();
            let read_timeout = self.read_timeout;
            smol::spawn(async move {
                if let Err(e) = serve_connection(stream, &service, read_timeout).await {
                    tracing::warn!("connection from {} failed: {}", peer, e);
                }
            })
            .detach();
        }
    }
}

async fn serve_connection(
    stream: TcpStream,
    service: &StatService,
    read_timeout: Duration,
) -> Result<(), ServerError> {
    let mut reader = BufReader::new(stream.clone());
    let mut writer = stream;
    let read = smol::future::or(async { Some(read_request(&mut reader).await) }, async {
        Timer::after(read_timeout).await;
        None
    })
    .await;
    let response = match read {
        Some(Ok(request)) => service.handle(&request).await,
        Some(Err(ServerError::BadRequest(msg))) => {
            tracing::debug!("rejecting request: {}", msg);
            Response::error(400, msg).write_to(&mut writer).await?;
            linger(&mut reader, &writer).await;
            return Ok(());
        }
        Some(Err(e)) => return Err(e),
        None => {
            tracing::debug!("request not received within {:?}", read_timeout);
            Response::error(408, "Request timeout")
        }
    };
    response.write_to(&mut writer).await?;
    Ok(())
}

/// Half-close and drain leftover input so the client reads the response
/// instead of a connection reset
async fn linger(reader: &mut BufReader<TcpStream>, writer: &TcpStream) {
    if writer.shutdown(Shutdown::Write).is_err() {
        return;
    }
    let drain = async {
        let mut buf = [0u8; 4096];
        let mut drained = 0;
        while drained < LINGER_BYTES {
            match reader.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => drained += n,
            }
        }
    };
    smol::future::or(drain, async {
        Timer::after(LINGER).await;
    })
    .await;
}
