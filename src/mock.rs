//! Mock wire and upper layer implementations to assist with testing
//
// https://github.com/rust-iot/rust-ethermac
// Copyright 2021 Ryan Kurte

use std::sync::{Arc, Mutex};
use std::vec::Vec;

use crate::{UpperLayer, Wire};
use crate::frame::Frame;

/// Mock wire, records transmitted frames
#[derive(Clone, Debug, Default)]
pub struct MockWire (Arc<Mutex<Vec<Frame>>>);

impl MockWire {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames transmitted so far
    pub fn sent(&self) -> Vec<Frame> {
        self.0.lock().unwrap().clone()
    }
}

impl Wire for MockWire {
    fn transmit(&mut self, frame: Frame) {
        self.0.lock().unwrap().push(frame);
    }
}

/// Mock upper layer, records delivered frames and frame requests
#[derive(Clone, Debug, Default)]
pub struct MockUpper {
    delivered: Arc<Mutex<Vec<Frame>>>,
    requests: Arc<Mutex<usize>>,
}

impl MockUpper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames delivered so far
    pub fn delivered(&self) -> Vec<Frame> {
        self.delivered.lock().unwrap().clone()
    }

    /// Number of frame requests issued (external queue mode)
    pub fn requests(&self) -> usize {
        *self.requests.lock().unwrap()
    }
}

impl UpperLayer for MockUpper {
    fn deliver(&mut self, frame: Frame) {
        self.delivered.lock().unwrap().push(frame);
    }

    fn request_frame(&mut self) {
        *self.requests.lock().unwrap() += 1;
    }
}
