// libs/doctor-cell/src/store/supabase.rs
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_database::supabase::{into_store_error, return_representation, SupabaseClient};
use shared_models::error::StoreError;

use crate::models::{
    Doctor, DoctorFilter, NewWorkShift, OwnerKind, ShiftFilter, ShiftOwner, WorkShift,
};
use crate::store::{DoctorDirectory, WorkScheduleStore};

const DOCTORS_PATH: &str = "/rest/v1/doctors";
const SCHEDULES_PATH: &str = "/rest/v1/workschedules";
const LAB_NURSES_PATH: &str = "/rest/v1/labnurses";

pub struct SupabaseDoctorDirectory {
    supabase: Arc<SupabaseClient>,
    auth_token: Option<String>,
}

impl SupabaseDoctorDirectory {
    pub fn new(supabase: Arc<SupabaseClient>, auth_token: Option<String>) -> Self {
        Self { supabase, auth_token }
    }

    async fn fetch(&self, path: &str) -> Result<Vec<Doctor>, StoreError> {
        let rows: Vec<Doctor> = self
            .supabase
            .request(Method::GET, path, self.auth_token.as_deref(), None)
            .await
            .map_err(into_store_error)?;
        Ok(rows)
    }
}

#[async_trait]
impl DoctorDirectory for SupabaseDoctorDirectory {
    async fn find_active(&self, filter: &DoctorFilter) -> Result<Vec<Doctor>, StoreError> {
        let mut path = format!("{}?status=eq.active&order=full_name.asc", DOCTORS_PATH);
        if let Some(specialty) = &filter.specialty {
            path.push_str(&format!("&specialty=eq.{}", urlencoding::encode(specialty)));
        }

        debug!("Fetching active doctors: {}", path);
        self.fetch(&path).await
    }

    async fn find_by_id(&self, doctor_id: Uuid) -> Result<Option<Doctor>, StoreError> {
        let path = format!("{}?id=eq.{}", DOCTORS_PATH, doctor_id);
        Ok(self.fetch(&path).await?.into_iter().next())
    }

    async fn list_specialties(&self) -> Result<Vec<String>, StoreError> {
        let path = format!("{}?status=eq.active&select=specialty", DOCTORS_PATH);
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, self.auth_token.as_deref(), None)
            .await
            .map_err(into_store_error)?;

        let mut specialties: Vec<String> = rows
            .iter()
            .filter_map(|row| row["specialty"].as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        specialties.sort();
        specialties.dedup();
        Ok(specialties)
    }

    async fn lab_nurse_exists(&self, nurse_id: Uuid) -> Result<bool, StoreError> {
        let path = format!("{}?id=eq.{}&select=id", LAB_NURSES_PATH, nurse_id);
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, self.auth_token.as_deref(), None)
            .await
            .map_err(into_store_error)?;
        Ok(!rows.is_empty())
    }
}

pub struct SupabaseWorkScheduleStore {
    supabase: Arc<SupabaseClient>,
    auth_token: Option<String>,
}

impl SupabaseWorkScheduleStore {
    pub fn new(supabase: Arc<SupabaseClient>, auth_token: Option<String>) -> Self {
        Self { supabase, auth_token }
    }

    fn query_for(filter: &ShiftFilter) -> String {
        let mut params: Vec<String> = Vec::new();

        match filter.owner {
            Some(ShiftOwner::Doctor(id)) => params.push(format!("doctor_id=eq.{}", id)),
            Some(ShiftOwner::Nurse(id)) => params.push(format!("lab_nurse_id=eq.{}", id)),
            None => {}
        }
        match filter.owner_kind {
            Some(OwnerKind::Doctor) => params.push("doctor_id=not.is.null".to_string()),
            Some(OwnerKind::Nurse) => params.push("lab_nurse_id=not.is.null".to_string()),
            None => {}
        }
        if let Some(ids) = &filter.doctor_ids {
            let list = ids.iter().map(Uuid::to_string).collect::<Vec<_>>().join(",");
            params.push(format!("doctor_id=in.({})", list));
        }
        if let Some(day) = filter.day_of_week {
            params.push(format!("day_of_week=eq.{}", day));
        }
        params.push("order=day_of_week.asc,shift_start.asc".to_string());

        format!("{}?{}", SCHEDULES_PATH, params.join("&"))
    }

    async fn write(&self, method: Method, path: &str, body: Option<Value>) -> Result<Vec<WorkShift>, StoreError> {
        self.supabase
            .request_with_headers(
                method,
                path,
                self.auth_token.as_deref(),
                body,
                Some(return_representation()),
            )
            .await
            .map_err(into_store_error)
    }
}

#[async_trait]
impl WorkScheduleStore for SupabaseWorkScheduleStore {
    async fn find(&self, filter: &ShiftFilter) -> Result<Vec<WorkShift>, StoreError> {
        if matches!(&filter.doctor_ids, Some(ids) if ids.is_empty()) {
            return Ok(Vec::new());
        }

        let path = Self::query_for(filter);
        debug!("Fetching work schedules: {}", path);

        self.supabase
            .request(Method::GET, &path, self.auth_token.as_deref(), None)
            .await
            .map_err(into_store_error)
    }

    async fn find_by_id(&self, shift_id: Uuid) -> Result<Option<WorkShift>, StoreError> {
        let path = format!("{}?id=eq.{}", SCHEDULES_PATH, shift_id);
        let rows: Vec<WorkShift> = self
            .supabase
            .request(Method::GET, &path, self.auth_token.as_deref(), None)
            .await
            .map_err(into_store_error)?;
        Ok(rows.into_iter().next())
    }

    async fn create(&self, shift: NewWorkShift) -> Result<WorkShift, StoreError> {
        let row = serde_json::to_value(shift.into_shift(Utc::now()))?;
        self.write(Method::POST, SCHEDULES_PATH, Some(row))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Database("insert returned no rows".to_string()))
    }

    async fn update(&self, shift: WorkShift) -> Result<WorkShift, StoreError> {
        let path = format!("{}?id=eq.{}", SCHEDULES_PATH, shift.id);
        let body = json!({
            "day_of_week": shift.day_of_week,
            "shift_start": shift.shift_start,
            "shift_end": shift.shift_end,
            "note": shift.note,
            "updated_at": Utc::now(),
        });

        self.write(Method::PATCH, &path, Some(body))
            .await?
            .into_iter()
            .next()
            .ok_or(StoreError::NotFound)
    }

    async fn delete(&self, shift_id: Uuid) -> Result<(), StoreError> {
        let path = format!("{}?id=eq.{}", SCHEDULES_PATH, shift_id);
        let deleted = self.write(Method::DELETE, &path, None).await?;

        if deleted.is_empty() {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
