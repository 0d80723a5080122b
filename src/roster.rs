// Staff roster management over the employees slice

use crate::models::{keys, Employee, StaffStation};
use crate::sync::SyncSession;
use chrono::NaiveDate;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RosterError {
    #[error("No such employee")]
    UnknownEmployee,
}

pub struct Roster {
    session: Arc<SyncSession>,
}

impl Roster {
    pub fn new(session: Arc<SyncSession>) -> Self {
        Self { session }
    }

    pub async fn list(&self) -> Vec<Employee> {
        self.session.load(keys::EMPLOYEES, Vec::new()).await
    }

    pub async fn add(
        &self,
        name: &str,
        station: StaffStation,
        wage_cents: i64,
        hired_on: NaiveDate,
    ) -> Employee {
        let mut employees = self.list().await;
        let employee = Employee::new(name.to_string(), station, wage_cents, hired_on);
        employees.push(employee.clone());
        self.session.save(keys::EMPLOYEES, &employees);
        tracing::info!("Added {} to the roster as {}", employee.name, station.as_str());
        employee
    }

    /// Replace the stored record matching `employee.id`
    pub async fn update(&self, employee: Employee) -> Result<(), RosterError> {
        let mut employees = self.list().await;
        let slot = employees
            .iter_mut()
            .find(|e| e.id == employee.id)
            .ok_or(RosterError::UnknownEmployee)?;
        *slot = employee;
        self.session.save(keys::EMPLOYEES, &employees);
        Ok(())
    }

    /// Keeps the record (and its payroll history) but takes the
    /// employee off the active roster
    pub async fn deactivate(&self, employee_id: &str) -> Result<(), RosterError> {
        let mut employees = self.list().await;
        let employee = employees
            .iter_mut()
            .find(|e| e.id == employee_id)
            .ok_or(RosterError::UnknownEmployee)?;
        employee.active = false;
        self.session.save(keys::EMPLOYEES, &employees);
        Ok(())
    }

    pub async fn remove(&self, employee_id: &str) -> Result<(), RosterError> {
        let mut employees = self.list().await;
        let before = employees.len();
        employees.retain(|e| e.id != employee_id);
        if employees.len() == before {
            return Err(RosterError::UnknownEmployee);
        }
        self.session.save(keys::EMPLOYEES, &employees);
        Ok(())
    }
}
