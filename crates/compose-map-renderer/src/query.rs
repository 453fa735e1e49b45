//! Cancellable rendered-feature queries.

use std::cell::Cell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::error::RendererError;
use crate::geometry::{Coordinate, ScreenPoint, ScreenRect};
use crate::style::Properties;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum QueryTarget {
    Point(ScreenPoint),
    Rect(ScreenRect),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueriedFeature {
    pub layer_id: String,
    pub feature_id: Option<String>,
    pub properties: Properties,
}

pub type QueryResult = Result<Vec<QueriedFeature>, RendererError>;

pub type QueryCallback = Box<dyn FnOnce(QueryResult)>;

/// Cancels an in-flight query. Dropping the token cancels it as well.
#[derive(Debug)]
pub struct QueryToken {
    canceled: Rc<Cell<bool>>,
}

impl QueryToken {
    /// Pairs a fresh token with a callback that drops its result once the
    /// token is canceled.
    pub fn wrap(callback: impl FnOnce(QueryResult) + 'static) -> (Self, QueryCallback) {
        let canceled = Rc::new(Cell::new(false));
        let flag = Rc::clone(&canceled);
        let guarded: QueryCallback = Box::new(move |result| {
            if flag.get() {
                log::trace!("dropping result of canceled feature query");
                return;
            }
            callback(result);
        });
        (Self { canceled }, guarded)
    }

    pub fn cancel(&self) {
        self.canceled.set(true);
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled.get()
    }
}

impl Drop for QueryToken {
    fn drop(&mut self) {
        self.canceled.set(true);
    }
}

pub trait FeatureQueryHost {
    /// Queries rendered features in `layer_ids`. `callback` is invoked later,
    /// on the host's serial context.
    fn query_features(
        &mut self,
        target: QueryTarget,
        layer_ids: &[String],
        callback: QueryCallback,
    );

    fn coordinate_for(&self, point: ScreenPoint) -> Coordinate;
}
