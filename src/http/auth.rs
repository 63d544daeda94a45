use base64::Engine;
use tracing::warn;

use crate::collection::{ApiKeyPlacement, Auth};

/// 认证最终落在请求上的位置
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    Header { name: String, value: String },
    Query { name: String, value: String },
}

/// 根据认证配置计算需要注入的凭据
///
/// digest、awsv4、ntlm 需要签名协议，目前不支持：记录警告后不带认证发送。
pub fn credential(auth: &Auth) -> Option<Credential> {
    match auth {
        Auth::None => None,
        Auth::Basic { username, password } => {
            let credentials = format!("{}:{}", username, password);
            let encoded = base64::engine::general_purpose::STANDARD.encode(credentials);
            Some(Credential::Header {
                name: "Authorization".to_string(),
                value: format!("Basic {}", encoded),
            })
        }
        Auth::Bearer { token } => Some(Credential::Header {
            name: "Authorization".to_string(),
            value: format!("Bearer {}", token),
        }),
        Auth::ApiKey { key, .. } if key.trim().is_empty() => {
            warn!("API key auth has an empty key name, skipping");
            None
        }
        Auth::ApiKey {
            key,
            value,
            placement: ApiKeyPlacement::Header,
        } => Some(Credential::Header {
            name: key.clone(),
            value: value.clone(),
        }),
        Auth::ApiKey {
            key,
            value,
            placement: ApiKeyPlacement::QueryParams,
        } => Some(Credential::Query {
            name: key.clone(),
            value: value.clone(),
        }),
        Auth::Digest { .. } | Auth::AwsV4 { .. } | Auth::Ntlm { .. } => {
            warn!(kind = auth.kind(), "Auth kind is not supported, sending without credentials");
            None
        }
    }
}
