//! A validating webhook that logs every admission request and allows it.
//!
//! ```sh
//! cargo run -p hookserve --example dump_request -- --port 8443
//! ```

use hookserve::prelude::*;

struct DumpRequest;

impl Initialize for DumpRequest {}

impl ValidatingHook for DumpRequest {
    fn validating_resource(&self) -> ResourceDescriptor {
        ResourceDescriptor::new(
            "samples.admission.example.io",
            "v1",
            "dumprequests",
            "dumprequest",
        )
    }

    fn validate(&self, request: &AdmissionRequest) -> AdmissionResponse {
        match serde_json::to_string_pretty(request) {
            Ok(dump) => tracing::info!(uid = %request.uid, "received\n{dump}"),
            Err(err) => {
                tracing::warn!(uid = %request.uid, error = %err, "unable to encode request")
            }
        }
        AdmissionResponse::allow(&request.uid)
    }
}

#[tokio::main]
async fn main() -> Result<(), hookserve::Error> {
    run_admission_server([HookRegistration::builder(DumpRequest).validating().build()]).await
}
