use geo::Point;
use serde::{Deserialize, Serialize};

use crate::category::Category;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub id: String,
    pub payload: String,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRestaurant {
    pub id: String,
    pub name: String,
    pub category: Category,
    pub phone: String,
    pub province: String,
    pub district: String,
    pub jibun_detail: String,
    pub doro_detail: String,
    /// x = longitude, y = latitude.
    pub location: Option<Point<f64>>,
}

impl NormalizedRestaurant {
    pub fn longitude(&self) -> Option<f64> {
        self.location.map(|point| point.x())
    }

    pub fn latitude(&self) -> Option<f64> {
        self.location.map(|point| point.y())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub index: usize,
    pub size: usize,
    /// Id of the last record of the previous page.
    pub after: Option<String>,
}

impl PageRequest {
    pub fn first(size: usize) -> Self {
        Self {
            index: 0,
            size,
            after: None,
        }
    }

    pub fn next(&self, page: &Page<RawRecord>) -> Self {
        Self {
            index: self.index + 1,
            size: self.size,
            after: page.items.last().map(|record| record.id.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub index: usize,
    pub items: Vec<T>,
}

impl<T> Page<T> {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
