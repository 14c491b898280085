mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use async_trait::async_trait;
use futures::future::join_all;
use uuid::Uuid;

use appointment_cell::models::{
    Appointment, AppointmentChanges, AppointmentError, AppointmentFilter, AppointmentStatus, NewAppointment,
    UpdateAppointmentRequest,
};
use appointment_cell::services::BookingService;
use appointment_cell::store::{AppointmentStore, InMemoryAppointmentStore};
use appointment_cell::SchedulingContext;
use doctor_cell::store::{InMemoryDoctorDirectory, InMemoryWorkScheduleStore};
use shared_config::SchedulingConfig;
use shared_models::error::StoreError;
use shared_utils::test_utils::local_instant;
use shared_utils::TimeGrid;

use common::{doctor, patient_request, staff_request, Clinic, MONDAY, TUESDAY};

#[tokio::test]
async fn test_monday_booking_scenario() {
    let dr = doctor("Dr. A", "general");
    let clinic = Clinic::new(vec![dr.clone()]);
    clinic.add_shift(dr.id, 1, "08:00", "12:00").await;
    let booking = clinic.booking();

    // Patient self-booking waits for staff.
    let pending = booking.book(patient_request(Some(dr.id), MONDAY, "09:00")).await.unwrap();
    assert_eq!(pending.status, AppointmentStatus::Pending);

    let staff_id = Uuid::new_v4();
    let confirmed = booking.confirm(pending.id, staff_id).await.unwrap();
    assert_eq!(confirmed.status, AppointmentStatus::Confirmed);
    assert_eq!(confirmed.staff_id, Some(staff_id));

    let taken = booking.book(staff_request(Some(dr.id), MONDAY, "09:00")).await;
    assert_matches!(taken, Err(AppointmentError::SlotTaken));

    let next = booking.book(patient_request(Some(dr.id), MONDAY, "09:30")).await.unwrap();
    assert_eq!(next.status, AppointmentStatus::Pending);

    let slots = booking
        .availability()
        .available_slots(Some(dr.id), None, MONDAY)
        .await
        .unwrap();
    let times: Vec<&str> = slots.iter().map(|s| s.local_time.as_str()).collect();
    assert_eq!(slots.len(), 7);
    assert!(!times.contains(&"2025-06-02T09:00"));
    assert!(times.contains(&"2025-06-02T08:30"));
    assert!(times.contains(&"2025-06-02T09:30"));
}

#[tokio::test]
async fn test_staff_booking_is_confirmed_immediately() {
    let dr = doctor("Dr. A", "general");
    let clinic = Clinic::new(vec![dr.clone()]);
    clinic.add_shift(dr.id, 1, "08:00", "12:00").await;
    let booking = clinic.booking();

    let appointment = booking.book(staff_request(Some(dr.id), MONDAY, "10:00")).await.unwrap();
    assert_eq!(appointment.status, AppointmentStatus::Confirmed);

    assert_matches!(
        booking.book(staff_request(Some(dr.id), MONDAY, "10:15")).await,
        Err(AppointmentError::SlotTaken)
    );
}

#[tokio::test]
async fn test_pending_requests_share_a_slot_until_confirmed() {
    let dr = doctor("Dr. A", "general");
    let clinic = Clinic::new(vec![dr.clone()]);
    clinic.add_shift(dr.id, 1, "08:00", "12:00").await;
    let booking = clinic.booking();

    let first = booking.book(patient_request(Some(dr.id), MONDAY, "09:00")).await.unwrap();
    let second = booking.book(patient_request(Some(dr.id), MONDAY, "09:00")).await.unwrap();

    booking.confirm(first.id, Uuid::new_v4()).await.unwrap();
    assert_matches!(
        booking.confirm(second.id, Uuid::new_v4()).await,
        Err(AppointmentError::SlotTaken)
    );
    assert_matches!(
        booking.confirm(first.id, Uuid::new_v4()).await,
        Err(AppointmentError::InvalidState { current: AppointmentStatus::Confirmed })
    );
}

#[tokio::test]
async fn test_cancel_suggestions_depend_on_prior_status() {
    let dr = doctor("Dr. A", "general");
    let clinic = Clinic::new(vec![dr.clone()]);
    clinic.add_shift(dr.id, 1, "08:00", "12:00").await;
    let booking = clinic.booking();

    let confirmed = booking.book(staff_request(Some(dr.id), MONDAY, "09:00")).await.unwrap();
    let outcome = booking.cancel(confirmed.id).await.unwrap();
    assert_eq!(outcome.appointment.status, AppointmentStatus::Cancelled);
    let suggestions = outcome.suggestions.expect("confirmed cancellation offers slots");
    assert!(!suggestions.is_empty());
    assert!(suggestions.len() <= 5);
    assert!(suggestions.iter().all(|s| s.doctor_id == Some(dr.id)));

    let pending = booking.book(patient_request(Some(dr.id), MONDAY, "10:00")).await.unwrap();
    let outcome = booking.cancel(pending.id).await.unwrap();
    assert!(outcome.suggestions.is_none());

    assert_matches!(booking.cancel(pending.id).await, Err(AppointmentError::AlreadyCancelled));
}

#[tokio::test]
async fn test_cancel_confirmed_without_open_slots_has_no_suggestions() {
    let dr = doctor("Dr. A", "general");
    let clinic = Clinic::new(vec![dr.clone()]);
    clinic.add_shift(dr.id, 1, "08:00", "09:00").await;
    let booking = clinic.booking();

    // The doctor works Monday only; a Tuesday booking has nothing to re-offer.
    let appointment = booking.book(staff_request(Some(dr.id), TUESDAY, "10:00")).await.unwrap();
    let outcome = booking.cancel(appointment.id).await.unwrap();

    assert!(outcome.suggestions.is_none());
}

#[tokio::test]
async fn test_reject_records_reason_and_offers_slots() {
    let dr = doctor("Dr. A", "general");
    let clinic = Clinic::new(vec![dr.clone()]);
    clinic.add_shift(dr.id, 1, "08:00", "12:00").await;
    let booking = clinic.booking();

    let mut request = patient_request(Some(dr.id), MONDAY, "09:00");
    request.note = Some("headache".to_string());
    let pending = booking.book(request).await.unwrap();

    let staff_id = Uuid::new_v4();
    let outcome = booking.reject(pending.id, staff_id, Some("doctor in surgery")).await.unwrap();

    assert_eq!(outcome.appointment.status, AppointmentStatus::Cancelled);
    assert_eq!(outcome.appointment.staff_id, Some(staff_id));
    assert_eq!(
        outcome.appointment.note.as_deref(),
        Some("headache\n[Rejected by staff]: doctor in surgery")
    );
    assert_eq!(outcome.suggestions.len(), 5);
    assert_eq!(outcome.suggestions[0].local_time, "2025-06-02T08:00");

    assert_matches!(
        booking.reject(pending.id, staff_id, None).await,
        Err(AppointmentError::AlreadyCancelled)
    );
}

#[tokio::test]
async fn test_reject_requires_pending() {
    let dr = doctor("Dr. A", "general");
    let clinic = Clinic::new(vec![dr.clone()]);
    clinic.add_shift(dr.id, 1, "08:00", "12:00").await;
    let booking = clinic.booking();

    let confirmed = booking.book(staff_request(Some(dr.id), MONDAY, "09:00")).await.unwrap();
    assert_matches!(
        booking.reject(confirmed.id, Uuid::new_v4(), Some("no")).await,
        Err(AppointmentError::InvalidState { current: AppointmentStatus::Confirmed })
    );
}

#[tokio::test]
async fn test_delete_only_pending() {
    let dr = doctor("Dr. A", "general");
    let clinic = Clinic::new(vec![dr.clone()]);
    clinic.add_shift(dr.id, 1, "08:00", "12:00").await;
    let booking = clinic.booking();

    let pending = booking.book(patient_request(Some(dr.id), MONDAY, "09:00")).await.unwrap();
    let confirmed = booking.book(staff_request(Some(dr.id), MONDAY, "11:00")).await.unwrap();

    booking.delete(pending.id).await.unwrap();
    assert_matches!(booking.get(pending.id).await, Err(AppointmentError::NotFound));

    assert_matches!(booking.delete(confirmed.id).await, Err(AppointmentError::InvalidState { .. }));
    assert_matches!(booking.delete(Uuid::new_v4()).await, Err(AppointmentError::NotFound));
}

#[tokio::test]
async fn test_update_does_not_recheck_conflicts() {
    let dr = doctor("Dr. A", "general");
    let clinic = Clinic::new(vec![dr.clone()]);
    clinic.add_shift(dr.id, 1, "08:00", "12:00").await;
    let booking = clinic.booking();

    booking.book(staff_request(Some(dr.id), MONDAY, "09:00")).await.unwrap();
    let other = booking.book(staff_request(Some(dr.id), MONDAY, "11:00")).await.unwrap();

    let moved = booking
        .update(
            other.id,
            UpdateAppointmentRequest {
                appointment_date: Some(local_instant(MONDAY, "09:00")),
                note: Some("moved".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(moved.appointment_date, local_instant(MONDAY, "09:00"));
    assert_eq!(moved.note.as_deref(), Some("moved"));
    assert_eq!(moved.status, AppointmentStatus::Confirmed);

    booking.cancel(moved.id).await.unwrap();
    assert_matches!(
        booking.update(moved.id, UpdateAppointmentRequest::default()).await,
        Err(AppointmentError::AlreadyCancelled)
    );
}

#[tokio::test]
async fn test_missing_appointment_is_not_found() {
    let clinic = Clinic::new(vec![]);
    let booking = clinic.booking();
    let id = Uuid::new_v4();

    assert_matches!(booking.confirm(id, Uuid::new_v4()).await, Err(AppointmentError::NotFound));
    assert_matches!(booking.cancel(id).await, Err(AppointmentError::NotFound));
    assert_matches!(booking.reject(id, Uuid::new_v4(), None).await, Err(AppointmentError::NotFound));
    assert!(booking.availability().suggested_slots(id, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_auto_assign_failure_propagates_from_book() {
    let clinic = Clinic::new(vec![doctor("Dr. A", "general")]);
    let booking = clinic.booking();

    let mut request = patient_request(None, MONDAY, "09:00");
    request.specialty = Some("neurology".to_string());

    assert_matches!(
        booking.book(request).await,
        Err(AppointmentError::NoEligibleDoctor { specialty: Some(s) }) if s == "neurology"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_bookings_confirm_exactly_one() {
    let dr = doctor("Dr. A", "general");
    let clinic = Clinic::new(vec![dr.clone()]);
    clinic.add_shift(dr.id, 1, "08:00", "12:00").await;
    let booking = Arc::new(clinic.booking());

    let attempts = (0..8).map(|_| {
        let booking = booking.clone();
        let request = staff_request(Some(dr.id), MONDAY, "09:00");
        tokio::spawn(async move { booking.book(request).await })
    });

    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.expect("booking task panicked"))
        .collect();

    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| *e == AppointmentError::SlotTaken));

    let confirmed = booking
        .availability()
        .check_slot(dr.id, local_instant(MONDAY, "09:00"))
        .await
        .unwrap();
    assert!(!confirmed.available);
}

#[tokio::test]
async fn test_listings_filter_by_status_and_order_by_date() {
    let a = doctor("Dr. A", "general");
    let b = doctor("Dr. B", "general");
    let clinic = Clinic::new(vec![a.clone(), b.clone()]);
    let booking = clinic.booking();
    let patient_id = Uuid::new_v4();

    for (doctor_id, date, time) in [(a.id, TUESDAY, "10:00"), (b.id, MONDAY, "11:00"), (a.id, MONDAY, "08:00")] {
        let mut request = patient_request(Some(doctor_id), date, time);
        request.patient_id = patient_id;
        booking.book(request).await.unwrap();
    }
    let staff_booked = booking.book(staff_request(Some(a.id), MONDAY, "09:00")).await.unwrap();

    let mine = booking.patient_appointments(patient_id, None).await.unwrap();
    let times: Vec<_> = mine.iter().map(|x| x.appointment_date).collect();
    assert_eq!(
        times,
        vec![
            local_instant(MONDAY, "08:00"),
            local_instant(MONDAY, "11:00"),
            local_instant(TUESDAY, "10:00"),
        ]
    );
    assert!(booking
        .patient_appointments(patient_id, Some(AppointmentStatus::Confirmed))
        .await
        .unwrap()
        .is_empty());

    let for_a = booking.doctor_appointments(a.id, None).await.unwrap();
    assert_eq!(for_a.len(), 3);
    assert!(for_a.windows(2).all(|w| w[0].appointment_date <= w[1].appointment_date));
    let confirmed_for_a = booking
        .doctor_appointments(a.id, Some(AppointmentStatus::Confirmed))
        .await
        .unwrap();
    assert_eq!(confirmed_for_a.iter().map(|x| x.id).collect::<Vec<_>>(), vec![staff_booked.id]);

    let all = booking.all_appointments(None).await.unwrap();
    assert_eq!(all.len(), 4);
    assert!(all.windows(2).all(|w| w[0].created_at >= w[1].created_at));
    assert_eq!(booking.all_appointments(Some(AppointmentStatus::Pending)).await.unwrap().len(), 3);
}

/// Cancels the row right before the guarded confirm runs, as a concurrent
/// staff rejection would.
struct RejectedMidway {
    inner: InMemoryAppointmentStore,
}

#[async_trait]
impl AppointmentStore for RejectedMidway {
    async fn find(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, StoreError> {
        self.inner.find(filter).await
    }

    async fn find_by_id(&self, appointment_id: Uuid) -> Result<Option<Appointment>, StoreError> {
        self.inner.find_by_id(appointment_id).await
    }

    async fn insert(&self, appointment: NewAppointment) -> Result<Appointment, StoreError> {
        self.inner.insert(appointment).await
    }

    async fn insert_confirmed_if_free(&self, appointment: NewAppointment) -> Result<Appointment, StoreError> {
        self.inner.insert_confirmed_if_free(appointment).await
    }

    async fn confirm_if_free(&self, appointment_id: Uuid, staff_id: Uuid) -> Result<Appointment, StoreError> {
        self.inner
            .update(appointment_id, &AppointmentChanges::status(AppointmentStatus::Cancelled))
            .await?;
        self.inner.confirm_if_free(appointment_id, staff_id).await
    }

    async fn update(&self, appointment_id: Uuid, changes: &AppointmentChanges) -> Result<Appointment, StoreError> {
        self.inner.update(appointment_id, changes).await
    }

    async fn delete(&self, appointment_id: Uuid) -> Result<(), StoreError> {
        self.inner.delete(appointment_id).await
    }
}

#[tokio::test]
async fn test_confirm_losing_race_to_reject_is_invalid_state() {
    let dr = doctor("Dr. A", "general");
    let grid = TimeGrid::default();
    let ctx = SchedulingContext::new(
        grid,
        SchedulingConfig::default(),
        Arc::new(InMemoryDoctorDirectory::new(vec![dr.clone()])),
        Arc::new(InMemoryWorkScheduleStore::new()),
        Arc::new(RejectedMidway {
            inner: InMemoryAppointmentStore::new(grid),
        }),
    );
    let booking = BookingService::new(ctx);

    let pending = booking.book(patient_request(Some(dr.id), MONDAY, "09:00")).await.unwrap();
    let result = booking.confirm(pending.id, Uuid::new_v4()).await;

    assert_matches!(
        result,
        Err(AppointmentError::InvalidState { current: AppointmentStatus::Cancelled })
    );
    assert!(result.unwrap_err().is_client_error());
}
