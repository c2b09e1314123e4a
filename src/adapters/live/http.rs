//! Live HTTP transport backed by reqwest.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::Client;

use crate::error::GenError;
use crate::ports::http::{
    FormField, HttpReply, HttpRequest, HttpTransport, Method, RequestBody, TransportFuture,
};

/// Transport that performs real network requests.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a transport with a default client.
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpTransport for ReqwestTransport {
    fn send(&self, request: &HttpRequest) -> TransportFuture<'_> {
        let request = request.clone();
        Box::pin(async move {
            let mut builder = match request.method {
                Method::Get => self.client.get(&request.url),
                Method::Post => self.client.post(&request.url),
                Method::Put => self.client.put(&request.url),
            };

            if let Some(ref auth) = request.auth {
                builder = builder.header(AUTHORIZATION, auth.header_value());
            }

            builder = match request.body {
                RequestBody::Empty => builder,
                RequestBody::Json { value } => builder.json(&value),
                RequestBody::Bytes { content_type, data } => {
                    builder.header(CONTENT_TYPE, content_type).body(data)
                }
                RequestBody::Multipart { fields } => builder.multipart(build_form(fields)?),
            };

            let response = builder.send().await?;
            let status = response.status().as_u16();
            let body = response.bytes().await?.to_vec();

            Ok(HttpReply::new(status, body))
        })
    }
}

fn build_form(fields: Vec<FormField>) -> Result<Form, GenError> {
    let mut form = Form::new();
    for field in fields {
        form = match field {
            FormField::Text { name, value } => form.text(name, value),
            FormField::File {
                name,
                file_name,
                content_type,
                data,
            } => {
                let part = Part::bytes(data)
                    .file_name(file_name)
                    .mime_str(&content_type)?;
                form.part(name, part)
            }
        };
    }
    Ok(form)
}
