// libs/appointment-cell/src/store/supabase.rs
//
// PostgREST-backed appointment table. Confirmed rows are guarded by the
// database:
//
//   create unique index appointments_confirmed_slot
//       on appointments (doctor_id, slot_bucket) where status = 'confirmed';
//
// `slot_bucket` is written on every insert and on every date change, so a
// racing second confirmation of the same slot comes back as HTTP 409.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_database::supabase::{http_status, into_store_error, return_representation, SupabaseClient};
use shared_models::error::StoreError;
use shared_utils::TimeGrid;

use crate::models::{
    Appointment, AppointmentChanges, AppointmentFilter, AppointmentStatus, NewAppointment,
};
use crate::store::AppointmentStore;

const APPOINTMENTS_PATH: &str = "/rest/v1/appointments";

pub struct SupabaseAppointmentStore {
    supabase: Arc<SupabaseClient>,
    auth_token: Option<String>,
    grid: TimeGrid,
}

impl SupabaseAppointmentStore {
    pub fn new(supabase: Arc<SupabaseClient>, auth_token: Option<String>, grid: TimeGrid) -> Self {
        Self { supabase, auth_token, grid }
    }

    pub(crate) fn query_for(filter: &AppointmentFilter) -> String {
        let mut params: Vec<String> = Vec::new();

        if let Some(ids) = &filter.doctor_ids {
            let list = ids.iter().map(Uuid::to_string).collect::<Vec<_>>().join(",");
            params.push(format!("doctor_id=in.({})", list));
        }
        if let Some(patient_id) = filter.patient_id {
            params.push(format!("patient_id=eq.{}", patient_id));
        }
        if let Some(status) = filter.status {
            params.push(format!("status=eq.{}", status));
        }
        if let Some(from) = filter.from {
            params.push(format!("appointment_date=gte.{}", encode_instant(from)));
        }
        if let Some(until) = filter.until {
            params.push(format!("appointment_date=lt.{}", encode_instant(until)));
        }
        params.push("order=appointment_date.asc".to_string());

        format!("{}?{}", APPOINTMENTS_PATH, params.join("&"))
    }

    fn row_for(&self, appointment: &Appointment) -> Result<Value, StoreError> {
        let mut row = serde_json::to_value(appointment)?;
        row["slot_bucket"] = json!(self.grid.slot_bucket(appointment.appointment_date));
        Ok(row)
    }

    async fn fetch(&self, path: &str) -> Result<Vec<Appointment>, StoreError> {
        self.supabase
            .request(Method::GET, path, self.auth_token.as_deref(), None)
            .await
            .map_err(into_store_error)
    }

    /// Write that echoes the affected rows. A 409 is read as the slot guard
    /// firing when `guarded` is set.
    async fn write(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        guarded: bool,
    ) -> Result<Vec<Appointment>, StoreError> {
        self.supabase
            .request_with_headers(
                method,
                path,
                self.auth_token.as_deref(),
                body,
                Some(return_representation()),
            )
            .await
            .map_err(|err| {
                if guarded && http_status(&err) == Some(409) {
                    warn!("Slot guard rejected write to {}", path);
                    StoreError::SlotTaken
                } else {
                    into_store_error(err)
                }
            })
    }

    async fn insert_row(&self, appointment: NewAppointment, guarded: bool) -> Result<Appointment, StoreError> {
        let created = appointment.into_appointment(Utc::now());
        let row = self.row_for(&created)?;

        let appointment = self
            .write(Method::POST, APPOINTMENTS_PATH, Some(row), guarded)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Database("insert returned no rows".to_string()))?;

        info!("Stored appointment {} ({})", appointment.id, appointment.status);
        Ok(appointment)
    }
}

fn encode_instant(instant: DateTime<Utc>) -> String {
    urlencoding::encode(&instant.to_rfc3339_opts(SecondsFormat::Secs, true)).into_owned()
}

#[async_trait]
impl AppointmentStore for SupabaseAppointmentStore {
    async fn find(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, StoreError> {
        if matches!(&filter.doctor_ids, Some(ids) if ids.is_empty()) {
            return Ok(Vec::new());
        }

        let path = Self::query_for(filter);
        debug!("Fetching appointments: {}", path);
        self.fetch(&path).await
    }

    async fn find_by_id(&self, appointment_id: Uuid) -> Result<Option<Appointment>, StoreError> {
        let path = format!("{}?id=eq.{}", APPOINTMENTS_PATH, appointment_id);
        Ok(self.fetch(&path).await?.into_iter().next())
    }

    async fn insert(&self, appointment: NewAppointment) -> Result<Appointment, StoreError> {
        let guarded = appointment.status == AppointmentStatus::Confirmed;
        self.insert_row(appointment, guarded).await
    }

    async fn insert_confirmed_if_free(&self, mut appointment: NewAppointment) -> Result<Appointment, StoreError> {
        appointment.status = AppointmentStatus::Confirmed;
        self.insert_row(appointment, true).await
    }

    async fn confirm_if_free(&self, appointment_id: Uuid, staff_id: Uuid) -> Result<Appointment, StoreError> {
        let path = format!("{}?id=eq.{}&status=eq.pending", APPOINTMENTS_PATH, appointment_id);
        let body = json!({
            "status": AppointmentStatus::Confirmed,
            "staff_id": staff_id,
            "updated_at": Utc::now(),
        });

        let mut rows = self.write(Method::PATCH, &path, Some(body), true).await?;
        match rows.pop() {
            Some(appointment) => Ok(appointment),
            None => match self.find_by_id(appointment_id).await? {
                Some(current) => Err(StoreError::Conflict(format!(
                    "appointment is {}, expected pending",
                    current.status
                ))),
                None => Err(StoreError::NotFound),
            },
        }
    }

    async fn update(&self, appointment_id: Uuid, changes: &AppointmentChanges) -> Result<Appointment, StoreError> {
        let path = format!("{}?id=eq.{}", APPOINTMENTS_PATH, appointment_id);

        let mut body = serde_json::to_value(changes)?;
        body["updated_at"] = json!(Utc::now());
        if let Some(date) = changes.appointment_date {
            body["slot_bucket"] = json!(self.grid.slot_bucket(date));
        }

        self.write(Method::PATCH, &path, Some(body), false)
            .await?
            .into_iter()
            .next()
            .ok_or(StoreError::NotFound)
    }

    async fn delete(&self, appointment_id: Uuid) -> Result<(), StoreError> {
        let path = format!("{}?id=eq.{}", APPOINTMENTS_PATH, appointment_id);
        let deleted = self.write(Method::DELETE, &path, None, false).await?;

        if deleted.is_empty() {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
