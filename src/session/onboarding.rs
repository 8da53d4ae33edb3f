// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! First-run profile form.
//!
//! Onboarding always creates a patient. Staff roles are granted later by an
//! admin through `assignAppRole`.

use crate::auth::Role;
use crate::error::ValidationError;
use crate::models::{Patient, PrincipalId, Profile};

const MIN_AGE: u64 = 1;
const MAX_AGE: u64 = 150;

/// Raw onboarding input as typed by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OnboardingForm {
    pub name: String,
    pub age: String,
}

/// Onboarding input after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidOnboarding {
    name: String,
    age: u64,
}

impl OnboardingForm {
    pub fn new(name: impl Into<String>, age: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            age: age.into(),
        }
    }

    /// Check the form without touching the network.
    pub fn validate(&self) -> Result<ValidOnboarding, ValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyField("your name"));
        }

        let age_text = self.age.trim();
        if age_text.is_empty() {
            return Err(ValidationError::EmptyField("your age"));
        }
        let age: u64 = age_text
            .parse()
            .map_err(|_| ValidationError::AgeOutOfRange(0))?;
        if !(MIN_AGE..=MAX_AGE).contains(&age) {
            return Err(ValidationError::AgeOutOfRange(age));
        }

        Ok(ValidOnboarding {
            name: name.to_string(),
            age,
        })
    }
}

impl ValidOnboarding {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn age(&self) -> u64 {
        self.age
    }

    /// Profile saved for the caller.
    pub fn to_profile(&self) -> Profile {
        Profile {
            name: self.name.clone(),
            role: Role::Patient,
            age: Some(self.age),
            specialty: None,
            department: None,
        }
    }

    /// Patient record registered under the caller's principal.
    pub fn to_patient(&self, principal: &PrincipalId) -> Patient {
        Patient {
            id: principal.clone(),
            name: self.name.clone(),
            age: self.age,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::principal;

    #[test]
    fn valid_form_produces_patient_profile() {
        let valid = OnboardingForm::new("  Grace Hopper ", "42").validate().unwrap();
        let profile = valid.to_profile();
        assert_eq!(profile.name, "Grace Hopper");
        assert_eq!(profile.role, Role::Patient);
        assert_eq!(profile.age, Some(42));

        let patient = valid.to_patient(&principal("aaaaa-aa"));
        assert_eq!(patient.id.as_str(), "aaaaa-aa");
        assert_eq!(patient.age, 42);
    }

    #[test]
    fn blank_fields_are_rejected() {
        assert_eq!(
            OnboardingForm::new("   ", "30").validate(),
            Err(ValidationError::EmptyField("your name"))
        );
        assert_eq!(
            OnboardingForm::new("Ada", "").validate(),
            Err(ValidationError::EmptyField("your age"))
        );
    }

    #[test]
    fn age_bounds_are_inclusive() {
        assert!(OnboardingForm::new("Ada", "1").validate().is_ok());
        assert!(OnboardingForm::new("Ada", "150").validate().is_ok());
        assert_eq!(
            OnboardingForm::new("Ada", "0").validate(),
            Err(ValidationError::AgeOutOfRange(0))
        );
        assert_eq!(
            OnboardingForm::new("Ada", "151").validate(),
            Err(ValidationError::AgeOutOfRange(151))
        );
    }

    #[test]
    fn non_numeric_age_is_rejected() {
        assert!(OnboardingForm::new("Ada", "forty").validate().is_err());
        assert!(OnboardingForm::new("Ada", "-3").validate().is_err());
    }
}
