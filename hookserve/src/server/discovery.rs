//! Discovery documents and health endpoints.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use hookserve_core::GroupVersion;
use hookserve_std::{assembler::ApiGroupDescriptor, lifecycle::HookState};
use serde::Serialize;

use super::{SharedState, api::ApiError};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GroupVersionForDiscovery {
    group_version: String,
    version: String,
}

impl From<&GroupVersion> for GroupVersionForDiscovery {
    fn from(gv: &GroupVersion) -> Self {
        Self {
            group_version: gv.to_string(),
            version: gv.version.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApiGroup {
    kind: &'static str,
    api_version: &'static str,
    name: String,
    versions: Vec<GroupVersionForDiscovery>,
    preferred_version: GroupVersionForDiscovery,
}

impl ApiGroup {
    fn new(group: &ApiGroupDescriptor) -> Self {
        Self {
            kind: "APIGroup",
            api_version: "v1",
            name: group.name.clone(),
            versions: group.group_versions.iter().map(Into::into).collect(),
            preferred_version: (&group.preferred_version).into(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApiGroupList {
    kind: &'static str,
    api_version: &'static str,
    groups: Vec<ApiGroup>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApiResource {
    name: String,
    singular_name: String,
    namespaced: bool,
    group: String,
    version: String,
    kind: String,
    verbs: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApiResourceList {
    kind: &'static str,
    api_version: &'static str,
    group_version: String,
    resources: Vec<ApiResource>,
}

pub(crate) async fn group_list(State(state): State<SharedState>) -> Json<ApiGroupList> {
    Json(ApiGroupList {
        kind: "APIGroupList",
        api_version: "v1",
        groups: state.groups.values().map(ApiGroup::new).collect(),
    })
}

pub(crate) async fn group(
    State(state): State<SharedState>,
    Path(group): Path<String>,
) -> Result<Json<ApiGroup>, ApiError> {
    state
        .groups
        .get(&group)
        .map(|g| Json(ApiGroup::new(g)))
        .ok_or_else(|| ApiError::not_found(format!("API group {group:?} is not served")))
}

pub(crate) async fn resource_list(
    State(state): State<SharedState>,
    Path((group, version)): Path<(String, String)>,
) -> Result<Json<ApiResourceList>, ApiError> {
    let routes = state
        .groups
        .get(&group)
        .and_then(|g| g.routes.routes(&version))
        .ok_or_else(|| ApiError::not_found(format!("{group}/{version} is not served")))?;

    let resources = routes
        .map(|entry| {
            let kind = entry.endpoint.produced_kind();
            ApiResource {
                name: entry.descriptor.resource.clone(),
                singular_name: entry.descriptor.singular.clone(),
                namespaced: entry.endpoint.namespaced(),
                group: kind.group,
                version: kind.version,
                kind: kind.kind,
                verbs: entry.endpoint.verbs().to_vec(),
            }
        })
        .collect();

    Ok(Json(ApiResourceList {
        kind: "APIResourceList",
        api_version: "v1",
        group_version: GroupVersion::new(&group, &version).to_string(),
        resources,
    }))
}

pub(crate) async fn livez() -> &'static str {
    "ok"
}

/// Readiness: one line per post-start hook, 500 until all have completed.
pub(crate) async fn readyz(State(state): State<SharedState>) -> Response {
    let mut body = String::from("[+]ping ok\n");
    let mut ready = true;
    for (name, hook_state) in state.status.states() {
        match hook_state {
            HookState::Completed => body.push_str(&format!("[+]poststarthook/{name} ok\n")),
            HookState::Pending => {
                ready = false;
                body.push_str(&format!("[-]poststarthook/{name} pending\n"));
            }
            HookState::Failed(reason) => {
                ready = false;
                body.push_str(&format!("[-]poststarthook/{name} failed: {reason}\n"));
            }
        }
    }

    if ready {
        body.push_str("ok");
        (StatusCode::OK, body).into_response()
    } else {
        body.push_str("readiness check failed");
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}
