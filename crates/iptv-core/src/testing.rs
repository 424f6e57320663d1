//! Recording engine and sink doubles for controller tests

use crate::config::EngineConfig;
use crate::engine::{EngineFactory, EngineId, OutputSink, SinkError, StreamEngine};
use crate::types::{Channel, QualityLevel, QualitySelection};
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    LoadSource(String),
    AttachOutput,
    StartLoad,
    RecoverMediaError,
    SetLevel(QualitySelection),
}

#[derive(Debug, Default)]
pub struct EngineJournal {
    pub created: Vec<(EngineId, EngineConfig)>,
    pub calls: Vec<(EngineId, EngineCall)>,
    pub destroyed: Vec<EngineId>,
    pub live: BTreeSet<EngineId>,
}

impl EngineJournal {
    pub fn calls_for(&self, id: EngineId) -> Vec<EngineCall> {
        self.calls
            .iter()
            .filter(|(engine, _)| *engine == id)
            .map(|(_, call)| call.clone())
            .collect()
    }

    pub fn last_created(&self) -> Option<EngineId> {
        self.created.last().map(|(id, _)| *id)
    }
}

#[derive(Clone)]
pub struct MockFactory {
    pub journal: Rc<RefCell<EngineJournal>>,
    pub supported: bool,
    pub levels: Vec<QualityLevel>,
}

impl MockFactory {
    pub fn new() -> Self {
        Self {
            journal: Rc::new(RefCell::new(EngineJournal::default())),
            supported: true,
            levels: vec![
                QualityLevel { index: 0, height: 360, bitrate: 800_000 },
                QualityLevel { index: 1, height: 720, bitrate: 2_500_000 },
                QualityLevel { index: 2, height: 1080, bitrate: 5_000_000 },
            ],
        }
    }

    pub fn unsupported() -> Self {
        Self {
            supported: false,
            ..Self::new()
        }
    }
}

impl EngineFactory for MockFactory {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn create(&mut self, id: EngineId, config: &EngineConfig) -> Box<dyn StreamEngine> {
        let mut journal = self.journal.borrow_mut();
        journal.created.push((id, config.clone()));
        journal.live.insert(id);
        Box::new(MockEngine {
            id,
            journal: Rc::clone(&self.journal),
            levels: self.levels.clone(),
            level: QualitySelection::Auto,
        })
    }
}

pub struct MockEngine {
    id: EngineId,
    journal: Rc<RefCell<EngineJournal>>,
    levels: Vec<QualityLevel>,
    level: QualitySelection,
}

impl MockEngine {
    fn record(&self, call: EngineCall) {
        self.journal.borrow_mut().calls.push((self.id, call));
    }
}

impl StreamEngine for MockEngine {
    fn load_source(&mut self, url: &str) {
        self.record(EngineCall::LoadSource(url.to_string()));
    }

    fn attach_output(&mut self, _sink: &dyn OutputSink) {
        self.record(EngineCall::AttachOutput);
    }

    fn start_load(&mut self) {
        self.record(EngineCall::StartLoad);
    }

    fn recover_media_error(&mut self) {
        self.record(EngineCall::RecoverMediaError);
    }

    fn current_level(&self) -> QualitySelection {
        self.level
    }

    fn set_current_level(&mut self, level: QualitySelection) {
        self.level = level;
        self.record(EngineCall::SetLevel(level));
    }

    fn levels(&self) -> Vec<QualityLevel> {
        self.levels.clone()
    }

    fn destroy(&mut self) {
        let mut journal = self.journal.borrow_mut();
        if journal.live.remove(&self.id) {
            journal.destroyed.push(self.id);
        }
    }
}

#[derive(Debug, Default)]
pub struct SinkJournal {
    pub source: Option<String>,
    pub paused: bool,
    pub play_calls: usize,
    pub pause_calls: usize,
    pub fail_play: bool,
}

#[derive(Clone)]
pub struct MockSink {
    pub journal: Rc<RefCell<SinkJournal>>,
}

impl MockSink {
    pub fn new() -> Self {
        Self {
            journal: Rc::new(RefCell::new(SinkJournal {
                paused: true,
                ..Default::default()
            })),
        }
    }
}

impl OutputSink for MockSink {
    fn play(&mut self) -> Result<(), SinkError> {
        let mut journal = self.journal.borrow_mut();
        journal.play_calls += 1;
        if journal.fail_play {
            return Err(SinkError("NotAllowedError".to_string()));
        }
        journal.paused = false;
        Ok(())
    }

    fn pause(&mut self) {
        let mut journal = self.journal.borrow_mut();
        journal.pause_calls += 1;
        journal.paused = true;
    }

    fn set_source(&mut self, url: &str) {
        self.journal.borrow_mut().source = Some(url.to_string());
    }

    fn clear_source(&mut self) {
        self.journal.borrow_mut().source = None;
    }

    fn is_paused(&self) -> bool {
        self.journal.borrow().paused
    }
}

/// `hls-0.m3u8`, `direct-1.ts`, ... alternating by `pattern`
pub fn channels(pattern: &[bool]) -> Vec<Channel> {
    pattern
        .iter()
        .enumerate()
        .map(|(idx, adaptive)| {
            if *adaptive {
                Channel::new(format!("HLS {}", idx), format!("https://cdn.example.com/hls-{}.m3u8", idx))
            } else {
                Channel::new(format!("Direct {}", idx), format!("http://cdn.example.com/direct-{}.ts", idx))
            }
        })
        .collect()
}
