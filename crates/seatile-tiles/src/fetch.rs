use std::fmt;
use std::sync::mpsc::{Receiver, Sender};
use std::thread;
use std::time::Duration;

use crate::cache::{RecordId, TileKey};
use crate::surface::TileTexture;

#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub record: RecordId,
    pub key: TileKey,
    pub url: String,
}

#[derive(Debug)]
pub struct FetchOutcome {
    pub record: RecordId,
    pub key: TileKey,
    pub url: String,
    pub result: Result<TileTexture, FetchError>,
}

#[derive(Debug)]
pub enum FetchError {
    Client(String),
    Http(reqwest::Error),
    Status(u16),
    Decode(image::ImageError),
    Rejected,
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Client(message) => write!(f, "http client unavailable: {}", message),
            Self::Http(err) => write!(f, "request failed: {}", err),
            Self::Status(code) => write!(f, "backend returned status {}", code),
            Self::Decode(err) => write!(f, "image decode failed: {}", err),
            Self::Rejected => write!(f, "fetcher rejected the request"),
        }
    }
}

impl std::error::Error for FetchError {}

impl From<reqwest::Error> for FetchError {
    fn from(value: reqwest::Error) -> Self {
        Self::Http(value)
    }
}

impl From<image::ImageError> for FetchError {
    fn from(value: image::ImageError) -> Self {
        Self::Decode(value)
    }
}

/// Fire-and-forget image download. Completions come back as
/// [`FetchOutcome`]s on the channel paired with the fetcher.
pub trait TileFetch {
    /// Returns `false` when the request could not be queued.
    fn request(&mut self, request: FetchRequest) -> bool;
}

pub struct HttpTileFetcher {
    senders: Vec<Sender<FetchRequest>>,
    next: usize,
}

impl HttpTileFetcher {
    pub fn new(worker_count: usize, timeout: Duration) -> (Self, Receiver<FetchOutcome>) {
        let worker_count = worker_count.max(1);
        let user_agent = format!("seatile/{}", env!("CARGO_PKG_VERSION"));
        let (result_tx, result_rx) = std::sync::mpsc::channel();
        let mut senders = Vec::with_capacity(worker_count);
        for _ in 0..worker_count {
            let (job_tx, job_rx) = std::sync::mpsc::channel();
            senders.push(job_tx);
            spawn_worker(job_rx, result_tx.clone(), timeout, user_agent.clone());
        }
        (Self { senders, next: 0 }, result_rx)
    }
}

impl TileFetch for HttpTileFetcher {
    fn request(&mut self, request: FetchRequest) -> bool {
        if self.senders.is_empty() {
            return false;
        }
        let idx = self.next % self.senders.len();
        self.next = self.next.wrapping_add(1);
        self.senders[idx].send(request).is_ok()
    }
}

fn spawn_worker(
    receiver: Receiver<FetchRequest>,
    sender: Sender<FetchOutcome>,
    timeout: Duration,
    user_agent: String,
) {
    thread::spawn(move || {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|err| err.to_string());
        while let Ok(request) = receiver.recv() {
            let result = match client.as_ref() {
                Ok(client) => fetch_tile(client, &request.url),
                Err(message) => Err(FetchError::Client(message.clone())),
            };
            let outcome = FetchOutcome {
                record: request.record,
                key: request.key,
                url: request.url,
                result,
            };
            if sender.send(outcome).is_err() {
                break;
            }
        }
    });
}

fn fetch_tile(client: &reqwest::blocking::Client, url: &str) -> Result<TileTexture, FetchError> {
    let response = client.get(url).send()?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status.as_u16()));
    }
    let bytes = response.bytes()?;
    decode_texture(&bytes)
}

fn decode_texture(bytes: &[u8]) -> Result<TileTexture, FetchError> {
    let image = image::load_from_memory(bytes)?.to_rgba8();
    Ok(TileTexture {
        width: image.width(),
        height: image.height(),
        data: image.into_raw(),
    })
}
