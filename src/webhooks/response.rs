//! Builds the admission response for a verdict.

use kube::core::Status;
use kube::core::response::{StatusCause, StatusDetails};

use super::policies::{Denial, Verdict};
use super::review::{AdmissionRequest, AdmissionResponse};

/// Build the response for `request`. The UID is always echoed verbatim.
pub fn build_response(request: &AdmissionRequest, verdict: &Verdict) -> AdmissionResponse {
    match verdict {
        Verdict::Allow => AdmissionResponse::allow(request.uid.clone()),
        Verdict::Deny(denial) => AdmissionResponse::deny(request.uid.clone(), denial_status(denial)),
    }
}

/// `metav1.Status` for a denial. `details` is left out when there are no
/// causes to report.
fn denial_status(denial: &Denial) -> Status {
    let status = Status::failure(&denial.message, &denial.reason).with_code(denial.code);
    if denial.causes.is_empty() {
        return status;
    }

    let causes = denial
        .causes
        .iter()
        .map(|cause| StatusCause {
            reason: cause.cause_type.clone(),
            message: cause.message.clone(),
            field: String::new(),
        })
        .collect();

    status.with_details(StatusDetails {
        name: String::new(),
        group: String::new(),
        kind: String::new(),
        uid: String::new(),
        causes,
        retry_after_seconds: 0,
    })
}
