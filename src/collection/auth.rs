use serde::{Deserialize, Serialize};

/// 请求认证配置，按 `kind` 区分
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Auth {
    #[default]
    None,
    Basic {
        #[serde(default)]
        username: String,
        #[serde(default)]
        password: String,
    },
    Bearer {
        #[serde(default)]
        token: String,
    },
    #[serde(rename = "apikey")]
    ApiKey {
        #[serde(default)]
        key: String,
        #[serde(default)]
        value: String,
        #[serde(default)]
        placement: ApiKeyPlacement,
    },
    Digest {
        #[serde(default)]
        username: String,
        #[serde(default)]
        password: String,
    },
    #[serde(rename = "awsv4", rename_all = "camelCase")]
    AwsV4 {
        #[serde(default)]
        access_key_id: String,
        #[serde(default)]
        secret_access_key: String,
        #[serde(default)]
        session_token: String,
        #[serde(default)]
        service: String,
        #[serde(default)]
        region: String,
        #[serde(default)]
        profile_name: String,
    },
    Ntlm {
        #[serde(default)]
        username: String,
        #[serde(default)]
        password: String,
        #[serde(default)]
        domain: String,
    },
}

/// API Key 放置位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ApiKeyPlacement {
    #[default]
    Header,
    #[serde(alias = "query")]
    QueryParams,
}

impl Auth {
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Auth::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Auth::Bearer {
            token: token.into(),
        }
    }

    pub fn api_key(
        key: impl Into<String>,
        value: impl Into<String>,
        placement: ApiKeyPlacement,
    ) -> Self {
        Auth::ApiKey {
            key: key.into(),
            value: value.into(),
            placement,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Auth::None => "none",
            Auth::Basic { .. } => "basic",
            Auth::Bearer { .. } => "bearer",
            Auth::ApiKey { .. } => "apikey",
            Auth::Digest { .. } => "digest",
            Auth::AwsV4 { .. } => "awsv4",
            Auth::Ntlm { .. } => "ntlm",
        }
    }

    /// 对每个字符串字段应用变换（插值使用）
    pub fn map_strings(&self, mut f: impl FnMut(&str) -> String) -> Auth {
        match self {
            Auth::None => Auth::None,
            Auth::Basic { username, password } => Auth::Basic {
                username: f(username),
                password: f(password),
            },
            Auth::Bearer { token } => Auth::Bearer { token: f(token) },
            Auth::ApiKey {
                key,
                value,
                placement,
            } => Auth::ApiKey {
                key: f(key),
                value: f(value),
                placement: *placement,
            },
            Auth::Digest { username, password } => Auth::Digest {
                username: f(username),
                password: f(password),
            },
            Auth::AwsV4 {
                access_key_id,
                secret_access_key,
                session_token,
                service,
                region,
                profile_name,
            } => Auth::AwsV4 {
                access_key_id: f(access_key_id),
                secret_access_key: f(secret_access_key),
                session_token: f(session_token),
                service: f(service),
                region: f(region),
                profile_name: f(profile_name),
            },
            Auth::Ntlm {
                username,
                password,
                domain,
            } => Auth::Ntlm {
                username: f(username),
                password: f(password),
                domain: f(domain),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_apikey() {
        let auth: Auth = serde_json::from_str(
            r#"{"kind": "apikey", "key": "X-Api-Key", "value": "{{key}}", "placement": "queryparams"}"#,
        )
        .unwrap();
        assert_eq!(
            auth,
            Auth::api_key("X-Api-Key", "{{key}}", ApiKeyPlacement::QueryParams)
        );
    }

    #[test]
    fn test_deserialize_awsv4_camel_case() {
        let auth: Auth = serde_json::from_str(
            r#"{"kind": "awsv4", "accessKeyId": "AK", "region": "eu-west-1"}"#,
        )
        .unwrap();
        match auth {
            Auth::AwsV4 {
                access_key_id,
                region,
                service,
                ..
            } => {
                assert_eq!(access_key_id, "AK");
                assert_eq!(region, "eu-west-1");
                assert_eq!(service, "");
            }
            other => panic!("Expected awsv4 auth, got {:?}", other),
        }
    }

    #[test]
    fn test_map_strings_touches_every_field() {
        let auth = Auth::Ntlm {
            username: "u".to_string(),
            password: "p".to_string(),
            domain: "d".to_string(),
        };
        let mapped = auth.map_strings(|s| s.to_uppercase());
        assert_eq!(
            mapped,
            Auth::Ntlm {
                username: "U".to_string(),
                password: "P".to_string(),
                domain: "D".to_string(),
            }
        );
        assert_eq!(mapped.kind(), "ntlm");
    }
}
