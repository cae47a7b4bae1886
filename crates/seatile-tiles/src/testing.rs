use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::mpsc::{Receiver, Sender};

use crate::cache::{RecordId, TileKey};
use crate::fetch::{FetchError, FetchOutcome, FetchRequest, TileFetch};
use crate::surface::{RenderSurface, RenderableSpec, TileTexture};

pub fn record_id(value: u64) -> RecordId {
    RecordId(value)
}

/// Ordered record of surface and fetcher calls shared between fakes.
#[derive(Debug, Clone, Default)]
pub struct EventLog(Rc<RefCell<Vec<String>>>);

impl EventLog {
    pub fn push(&self, entry: String) {
        self.0.borrow_mut().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

/// Handle that is deliberately neither `Clone` nor `Copy`.
#[derive(Debug, PartialEq, Eq)]
pub struct FakeHandle(u64);

#[derive(Debug, Default)]
pub struct FakeSurface {
    next: u64,
    live: HashMap<u64, RenderableSpec>,
    pub added: Vec<RenderableSpec>,
    pub removed: Vec<TileKey>,
    textured: Vec<TileKey>,
    log: Option<EventLog>,
}

impl FakeSurface {
    pub fn with_log(log: EventLog) -> Self {
        Self {
            log: Some(log),
            ..Self::default()
        }
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn textured_count(&self) -> usize {
        self.textured.len()
    }

    pub fn added_urls(&self) -> Vec<String> {
        self.added.iter().map(|spec| spec.image_url.clone()).collect()
    }

    fn record(&self, entry: String) {
        if let Some(log) = self.log.as_ref() {
            log.push(entry);
        }
    }
}

impl RenderSurface for FakeSurface {
    type Handle = FakeHandle;

    fn add(&mut self, spec: RenderableSpec) -> FakeHandle {
        self.next += 1;
        self.record(format!("add {}", spec.key));
        self.added.push(spec.clone());
        self.live.insert(self.next, spec);
        FakeHandle(self.next)
    }

    fn remove(&mut self, handle: FakeHandle) {
        let spec = self
            .live
            .remove(&handle.0)
            .expect("renderable released twice");
        self.record(format!("remove {}", spec.key));
        self.removed.push(spec.key);
    }

    fn attach_texture(&mut self, handle: &FakeHandle, _texture: TileTexture) {
        let spec = self
            .live
            .get(&handle.0)
            .expect("texture attached to released renderable");
        self.textured.push(spec.key);
    }
}

pub struct RecordingFetcher {
    requests: Vec<FetchRequest>,
    accepting: bool,
    results: Sender<FetchOutcome>,
    log: Option<EventLog>,
}

impl RecordingFetcher {
    pub fn new() -> (Self, Receiver<FetchOutcome>) {
        let (results, receiver) = std::sync::mpsc::channel();
        (
            Self {
                requests: Vec::new(),
                accepting: true,
                results,
                log: None,
            },
            receiver,
        )
    }

    pub fn with_log(mut self, log: EventLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn set_accepting(&mut self, accepting: bool) {
        self.accepting = accepting;
    }

    pub fn requests(&self) -> &[FetchRequest] {
        &self.requests
    }

    /// Resolves every recorded request successfully on the results channel.
    pub fn complete_all(&self) {
        for request in self.requests.iter() {
            let _ = self.results.send(ok_outcome(request));
        }
    }

    pub fn fail(&self, request: &FetchRequest, status: u16) {
        let _ = self.results.send(failed_outcome(request, status));
    }
}

impl TileFetch for RecordingFetcher {
    fn request(&mut self, request: FetchRequest) -> bool {
        if !self.accepting {
            return false;
        }
        if let Some(log) = self.log.as_ref() {
            log.push(format!("fetch {}", request.key));
        }
        self.requests.push(request);
        true
    }
}

pub fn ok_outcome(request: &FetchRequest) -> FetchOutcome {
    FetchOutcome {
        record: request.record,
        key: request.key,
        url: request.url.clone(),
        result: Ok(TileTexture {
            width: 1,
            height: 1,
            data: vec![0, 64, 128, 255],
        }),
    }
}

pub fn failed_outcome(request: &FetchRequest, status: u16) -> FetchOutcome {
    FetchOutcome {
        record: request.record,
        key: request.key,
        url: request.url.clone(),
        result: Err(FetchError::Status(status)),
    }
}
