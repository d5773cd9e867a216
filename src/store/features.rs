//! Point and polygon operations.

use chrono::Utc;
use geo::{Geometry, Intersects};
use sled::transaction::{ConflictableTransactionResult, Transactional};
use sled::Batch;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

use super::{encode_rows, get, put, remove, scan, transaction_error, LayerStore};
use crate::county::CountyService;
use crate::error::{DfciError, Result};
use crate::geometry::{parse_wkt, to_wkt};
use crate::models::{
    LayerKind, LayerOptions, NewPoint, NewPolygon, PointRecord, PolygonRecord, RecordUpdate,
};

impl LayerStore {
    /// Add a single point; the county is looked up and the point awaits approval
    pub fn add_point(&self, counties: &CountyService, new: NewPoint) -> Result<PointRecord> {
        let county = counties
            .county_for_point(new.longitude, new.latitude)
            .ok_or(DfciError::NoCounty)?;
        self.insert_point(new, county, false)
    }

    /// Add a single polygon; the county is looked up and the polygon awaits approval
    pub fn add_polygon(&self, counties: &CountyService, new: NewPolygon) -> Result<PolygonRecord> {
        let geometry = parse_wkt(&new.geometry)?;
        let county = counties.assign(&geometry)?;
        let new = NewPolygon {
            geometry: to_wkt(&geometry)?,
            ..new
        };
        self.insert_polygon(new, county, false)
    }

    pub fn insert_point(&self, new: NewPoint, county: String, approved: bool) -> Result<PointRecord> {
        let record = self.point_record(new, county, approved)?;
        put(&self.points, record.id, &record)?;
        debug!(
            "Stored point {} in layer '{}' ({})",
            record.id, record.layer_name, record.county
        );
        Ok(record)
    }

    pub fn insert_polygon(
        &self,
        new: NewPolygon,
        county: String,
        approved: bool,
    ) -> Result<PolygonRecord> {
        let record = self.polygon_record(new, county, approved)?;
        put(&self.polygons, record.id, &record)?;
        debug!(
            "Stored polygon {} in layer '{}' ({})",
            record.id, record.layer_name, record.county
        );
        Ok(record)
    }

    /// Store points and polygons in one transaction: either every record is
    /// written or none is
    pub fn insert_all(
        &self,
        points: Vec<(NewPoint, String)>,
        polygons: Vec<(NewPolygon, String)>,
        approved: bool,
    ) -> Result<(Vec<PointRecord>, Vec<PolygonRecord>)> {
        let points = points
            .into_iter()
            .map(|(new, county)| self.point_record(new, county, approved))
            .collect::<Result<Vec<_>>>()?;
        let polygons = polygons
            .into_iter()
            .map(|(new, county)| self.polygon_record(new, county, approved))
            .collect::<Result<Vec<_>>>()?;

        let point_rows = encode_rows(points.iter().map(|r| (r.id, r)))?;
        let polygon_rows = encode_rows(polygons.iter().map(|r| (r.id, r)))?;

        (&self.points, &self.polygons)
            .transaction(|(point_tree, polygon_tree)| -> ConflictableTransactionResult<(), ()> {
                for (key, value) in &point_rows {
                    point_tree.insert(&key[..], value.as_slice())?;
                }
                for (key, value) in &polygon_rows {
                    polygon_tree.insert(&key[..], value.as_slice())?;
                }
                Ok(())
            })
            .map_err(transaction_error)?;

        debug!(
            "Stored {} points and {} polygons in one transaction",
            points.len(),
            polygons.len()
        );
        Ok((points, polygons))
    }

    fn point_record(&self, new: NewPoint, county: String, approved: bool) -> Result<PointRecord> {
        Ok(PointRecord {
            id: self.next_id()?,
            layer_name: new.layer_name,
            latitude: new.latitude,
            longitude: new.longitude,
            county,
            approved,
            attributes: new.attributes,
            metadata: new.metadata,
            created_at: Utc::now(),
        })
    }

    fn polygon_record(
        &self,
        new: NewPolygon,
        county: String,
        approved: bool,
    ) -> Result<PolygonRecord> {
        Ok(PolygonRecord {
            id: self.next_id()?,
            layer_name: new.layer_name,
            geometry: new.geometry,
            county,
            approved,
            attributes: new.attributes,
            metadata: new.metadata,
            created_at: Utc::now(),
        })
    }

    pub fn point(&self, id: u64) -> Result<PointRecord> {
        get(&self.points, id)?.ok_or(DfciError::NotFound { kind: "point", id })
    }

    pub fn polygon(&self, id: u64) -> Result<PolygonRecord> {
        get(&self.polygons, id)?.ok_or(DfciError::NotFound { kind: "polygon", id })
    }

    pub fn update_point(&self, id: u64, update: RecordUpdate) -> Result<PointRecord> {
        let mut record = self.point(id)?;
        update.apply(
            &mut record.approved,
            &mut record.attributes,
            &mut record.metadata,
        );
        put(&self.points, id, &record)?;
        Ok(record)
    }

    pub fn update_polygon(&self, id: u64, update: RecordUpdate) -> Result<PolygonRecord> {
        let mut record = self.polygon(id)?;
        update.apply(
            &mut record.approved,
            &mut record.attributes,
            &mut record.metadata,
        );
        put(&self.polygons, id, &record)?;
        Ok(record)
    }

    pub fn approve_point(&self, id: u64) -> Result<PointRecord> {
        self.update_point(id, RecordUpdate::approve())
    }

    pub fn approve_polygon(&self, id: u64) -> Result<PolygonRecord> {
        self.update_polygon(id, RecordUpdate::approve())
    }

    pub fn delete_point(&self, id: u64) -> Result<()> {
        if !remove(&self.points, id)? {
            return Err(DfciError::NotFound { kind: "point", id });
        }
        Ok(())
    }

    pub fn delete_polygon(&self, id: u64) -> Result<()> {
        if !remove(&self.polygons, id)? {
            return Err(DfciError::NotFound { kind: "polygon", id });
        }
        Ok(())
    }

    /// Remove every record of a layer, returning how many were deleted
    pub fn delete_layer(&self, kind: LayerKind, layer_name: &str) -> Result<usize> {
        let ids: Vec<u64> = match kind {
            LayerKind::Points => self.points_by_layer(layer_name)?.iter().map(|r| r.id).collect(),
            LayerKind::Polygons => self
                .polygons_by_layer(layer_name)?
                .iter()
                .map(|r| r.id)
                .collect(),
        };

        let tree = match kind {
            LayerKind::Points => &self.points,
            LayerKind::Polygons => &self.polygons,
        };
        let mut batch = Batch::default();
        for id in &ids {
            batch.remove(&id.to_be_bytes()[..]);
        }
        tree.apply_batch(batch)?;

        info!("Deleted {} {} from layer '{}'", ids.len(), kind, layer_name);
        Ok(ids.len())
    }

    /// Distinct layer names per kind, sorted
    pub fn layer_options(&self) -> Result<LayerOptions> {
        let points: BTreeSet<String> = self
            .all_points()?
            .into_iter()
            .map(|r| r.layer_name)
            .collect();
        let polygons: BTreeSet<String> = self
            .all_polygons()?
            .into_iter()
            .map(|r| r.layer_name)
            .collect();

        Ok(LayerOptions {
            points: points.into_iter().collect(),
            polygons: polygons.into_iter().collect(),
        })
    }

    pub fn all_points(&self) -> Result<Vec<PointRecord>> {
        scan(&self.points, |_: &PointRecord| true)
    }

    pub fn all_polygons(&self) -> Result<Vec<PolygonRecord>> {
        scan(&self.polygons, |_: &PolygonRecord| true)
    }

    pub fn points_by_layer(&self, layer_name: &str) -> Result<Vec<PointRecord>> {
        scan(&self.points, |r: &PointRecord| r.layer_name == layer_name)
    }

    pub fn polygons_by_layer(&self, layer_name: &str) -> Result<Vec<PolygonRecord>> {
        scan(&self.polygons, |r: &PolygonRecord| r.layer_name == layer_name)
    }

    pub fn points_by_county(&self, county: &str) -> Result<Vec<PointRecord>> {
        scan(&self.points, |r: &PointRecord| r.county == county)
    }

    pub fn polygons_by_county(&self, county: &str) -> Result<Vec<PolygonRecord>> {
        scan(&self.polygons, |r: &PolygonRecord| r.county == county)
    }

    /// Points awaiting approval
    pub fn pending_points(&self) -> Result<Vec<PointRecord>> {
        scan(&self.points, |r: &PointRecord| !r.approved)
    }

    /// Polygons awaiting approval
    pub fn pending_polygons(&self) -> Result<Vec<PolygonRecord>> {
        scan(&self.polygons, |r: &PolygonRecord| !r.approved)
    }

    pub fn points_intersecting(&self, geometry: &Geometry<f64>) -> Result<Vec<PointRecord>> {
        scan(&self.points, |r: &PointRecord| geometry.intersects(&r.point()))
    }

    pub fn polygons_intersecting(&self, geometry: &Geometry<f64>) -> Result<Vec<PolygonRecord>> {
        scan(&self.polygons, |r: &PolygonRecord| match parse_wkt(&r.geometry) {
            Ok(g) => geometry.intersects(&g),
            Err(e) => {
                warn!("Skipping polygon {} with unreadable geometry: {}", r.id, e);
                false
            }
        })
    }
}
