//! Soma centre estimation from three orthogonal views.
//!
//! An operator looks at a cell mesh along each axis in turn and places a
//! cursor at the apparent centre of the soma. Each view pins down two of the
//! three coordinates:
//!
//! | view | fixes |
//! |------|-------|
//! | XZ   | x, z  |
//! | YZ   | y, z  |
//! | XY   | x, y  |
//!
//! Every axis is seen in exactly two views and the estimate is the mean of
//! those two readings. [`SomaEstimator`] enforces the view order
//! (XZ, then YZ, then XY) as an explicit state machine; [`SomaSurvey`] walks a
//! list of cells collecting one estimate per cell.
//!
//! ```
//! use synmesh::soma::{SomaEstimator, View};
//! use nalgebra::Point3;
//!
//! let mut estimator = SomaEstimator::new();
//! estimator.record(View::Xz, Point3::new(1.0, 0.0, 3.0)).unwrap();
//! estimator.record(View::Yz, Point3::new(0.0, 2.0, 5.0)).unwrap();
//! let centre = estimator.record(View::Xy, Point3::new(3.0, 4.0, 0.0)).unwrap();
//!
//! assert_eq!(centre, Some(Point3::new(2.0, 3.0, 4.0)));
//! ```

use nalgebra::Point3;

use crate::error::{Result, SynMeshError};
use crate::graph::CellId;

/// A viewing plane.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum View {
    /// Looking along y.
    Xz,
    /// Looking along x.
    Yz,
    /// Looking along z.
    Xy,
}

/// Progress of one estimate.
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum SomaState {
    /// Waiting for the XZ reading.
    AwaitingView1,
    /// Waiting for the YZ reading.
    AwaitingView2 {
        /// XZ reading.
        xz: Point3<f64>,
    },
    /// Waiting for the XY reading.
    AwaitingView3 {
        /// XZ reading.
        xz: Point3<f64>,
        /// YZ reading.
        yz: Point3<f64>,
    },
    /// All three readings taken.
    Complete {
        /// The estimated centre.
        centre: Point3<f64>,
    },
}

impl SomaState {
    /// The view this state is waiting for, if any.
    pub fn awaited_view(&self) -> Option<View> {
        match self {
            SomaState::AwaitingView1 => Some(View::Xz),
            SomaState::AwaitingView2 { .. } => Some(View::Yz),
            SomaState::AwaitingView3 { .. } => Some(View::Xy),
            SomaState::Complete { .. } => None,
        }
    }
}

/// Combine the three readings into a centre.
pub fn soma_centre(xz: &Point3<f64>, yz: &Point3<f64>, xy: &Point3<f64>) -> Point3<f64> {
    Point3::new(
        (xz.x + xy.x) / 2.0,
        (yz.y + xy.y) / 2.0,
        (xz.z + yz.z) / 2.0,
    )
}

/// Three-view soma centre estimator.
#[derive(Clone, Debug)]
pub struct SomaEstimator {
    state: SomaState,
}

impl Default for SomaEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl SomaEstimator {
    /// Start a new estimate.
    pub fn new() -> Self {
        Self {
            state: SomaState::AwaitingView1,
        }
    }

    /// Current state.
    pub fn state(&self) -> &SomaState {
        &self.state
    }

    /// The estimate, once all views are recorded.
    pub fn centre(&self) -> Option<Point3<f64>> {
        match self.state {
            SomaState::Complete { centre } => Some(centre),
            _ => None,
        }
    }

    /// Record a cursor reading for `view`.
    ///
    /// Returns the centre when this reading completes the estimate.
    ///
    /// # Errors
    ///
    /// [`SynMeshError::InvalidParameter`] if `view` is not the awaited view
    /// or the estimate is already complete. The state is left unchanged.
    pub fn record(&mut self, view: View, cursor: Point3<f64>) -> Result<Option<Point3<f64>>> {
        let next = match (self.state, view) {
            (SomaState::AwaitingView1, View::Xz) => SomaState::AwaitingView2 { xz: cursor },
            (SomaState::AwaitingView2 { xz }, View::Yz) => {
                SomaState::AwaitingView3 { xz, yz: cursor }
            }
            (SomaState::AwaitingView3 { xz, yz }, View::Xy) => SomaState::Complete {
                centre: soma_centre(&xz, &yz, &cursor),
            },
            (SomaState::Complete { .. }, _) => {
                return Err(SynMeshError::invalid_param(
                    "view",
                    format!("{:?}", view),
                    "estimate already complete",
                ));
            }
            _ => {
                return Err(SynMeshError::invalid_param(
                    "view",
                    format!("{:?}", view),
                    "not the awaited view",
                ));
            }
        };
        self.state = next;
        Ok(self.centre())
    }

    /// Discard readings and start over.
    pub fn reset(&mut self) {
        self.state = SomaState::AwaitingView1;
    }
}

/// Walks a list of cells, estimating each soma in turn.
#[derive(Clone, Debug)]
pub struct SomaSurvey {
    cells: Vec<CellId>,
    position: usize,
    estimator: SomaEstimator,
    results: Vec<(CellId, Point3<f64>)>,
}

impl SomaSurvey {
    /// Start a survey over `cells`, in order.
    pub fn new(cells: Vec<CellId>) -> Self {
        Self {
            cells,
            position: 0,
            estimator: SomaEstimator::new(),
            results: Vec::new(),
        }
    }

    /// The cell currently being estimated, or `None` when finished.
    pub fn current(&self) -> Option<CellId> {
        self.cells.get(self.position).copied()
    }

    /// The estimator for the current cell.
    pub fn estimator(&self) -> &SomaEstimator {
        &self.estimator
    }

    /// Record a reading for the current cell. When it completes the cell,
    /// the estimate is stored and the survey advances.
    pub fn record(&mut self, view: View, cursor: Point3<f64>) -> Result<Option<(CellId, Point3<f64>)>> {
        let cell = self.current().ok_or_else(|| {
            SynMeshError::invalid_param("view", format!("{:?}", view), "survey is finished")
        })?;

        match self.estimator.record(view, cursor)? {
            Some(centre) => {
                log::debug!("Soma of cell {} at {:?}", cell, centre);
                self.results.push((cell, centre));
                self.position += 1;
                self.estimator.reset();
                Ok(Some((cell, centre)))
            }
            None => Ok(None),
        }
    }

    /// Skip the current cell without an estimate.
    pub fn skip(&mut self) {
        if self.position < self.cells.len() {
            self.position += 1;
            self.estimator.reset();
        }
    }

    /// Whether every cell has been handled.
    pub fn is_finished(&self) -> bool {
        self.position >= self.cells.len()
    }

    /// Estimates collected so far, in survey order.
    pub fn results(&self) -> &[(CellId, Point3<f64>)] {
        &self.results
    }
}
