//! Per-resource query and command surface.
//!
//! An [`Endpoint`] binds a [`Resource`] type to a collection URL. It is
//! stateless: every call is a fresh round trip.

use std::fmt;
use std::marker::PhantomData;

use log::debug;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::firemon::record::{Record, Resource};
use crate::firemon::request::{Request, Response};
use crate::firemon::session::{Context, Params};

/// Constraints as given by the caller.
pub type Filters<'a> = &'a [(&'a str, &'a str)];

/// How filter constraints become query parameters.
#[derive(Clone, Copy)]
pub enum FilterStyle {
    /// Sent verbatim, one parameter per constraint.
    Params,
    /// A single constraint's value as `search=`. More than one constraint
    /// is a usage error.
    Search,
    /// One `filter=key=value` per constraint.
    FilterParam,
    Custom(fn(Filters<'_>) -> Params),
}

impl FilterStyle {
    fn build(&self, filters: Filters<'_>) -> Result<Params> {
        Ok(match self {
            FilterStyle::Params => filters
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            FilterStyle::Search => match filters {
                [(_, value)] => vec![("search".to_string(), value.to_string())],
                _ => {
                    return Err(Error::usage(format!(
                        "search filtering takes exactly one constraint, got {}",
                        filters.len()
                    )));
                }
            },
            FilterStyle::FilterParam => filters
                .iter()
                .map(|(k, v)| ("filter".to_string(), format!("{k}={v}")))
                .collect(),
            FilterStyle::Custom(build) => build(filters),
        })
    }
}

impl fmt::Debug for FilterStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterStyle::Params => f.write_str("Params"),
            FilterStyle::Search => f.write_str("Search"),
            FilterStyle::FilterParam => f.write_str("FilterParam"),
            FilterStyle::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// How `count()` is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountStyle {
    /// The server's `total`.
    Total,
    /// Length of `all()`.
    ClientSide,
    Unsupported,
}

/// Result of a create call.
#[derive(Debug)]
pub enum Created<R> {
    One(R),
    /// Bulk creates answer with a list.
    Many(Vec<R>),
}

impl<R> Created<R> {
    /// The single created resource, if the server returned one.
    pub fn one(self) -> Option<R> {
        match self {
            Created::One(r) => Some(r),
            Created::Many(_) => None,
        }
    }

    pub fn into_vec(self) -> Vec<R> {
        match self {
            Created::One(r) => vec![r],
            Created::Many(all) => all,
        }
    }
}

/// A collection of `R` on the server.
pub struct Endpoint<R: Resource = Record> {
    ctx: Context,
    url: String,
    filter_style: FilterStyle,
    filter_key: Option<&'static str>,
    count_style: CountStyle,
    _resource: PhantomData<fn() -> R>,
}

impl<R: Resource> Endpoint<R> {
    /// Endpoint at the URL declared by `R`'s schema, or the application
    /// root for schemas without a path.
    pub fn new(ctx: &Context) -> Self {
        let url = R::schema()
            .endpoint_url(ctx)
            .unwrap_or_else(|| ctx.app_url.clone());
        Self::at(ctx, url)
    }

    /// Endpoint at an explicit URL, e.g. a sub-collection of a record.
    pub fn at(ctx: &Context, url: impl Into<String>) -> Self {
        Self {
            ctx: ctx.clone(),
            url: url.into().trim_end_matches('/').to_string(),
            filter_style: FilterStyle::Params,
            filter_key: None,
            count_style: CountStyle::Total,
            _resource: PhantomData,
        }
    }

    pub fn filter_style(mut self, style: FilterStyle) -> Self {
        self.filter_style = style;
        self
    }

    /// Path segment filtered queries are sent to.
    pub fn filter_key(mut self, key: &'static str) -> Self {
        self.filter_key = Some(key);
        self
    }

    pub fn count_style(mut self, style: CountStyle) -> Self {
        self.count_style = style;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Request against the collection URL.
    pub fn request(&self) -> Request {
        Request::new(&self.ctx.session, &self.url)
    }

    /// Wrap one JSON object as `R`.
    pub fn wrap(&self, value: Value) -> Result<R> {
        match value {
            Value::Object(config) => Ok(R::from_record(Record::new(
                config,
                R::schema(),
                self.ctx.clone(),
            ))),
            other => Err(Error::unexpected(format!(
                "{} returned {} where an object was expected",
                self.url,
                kind_of(&other)
            ))),
        }
    }

    /// Wrap every element of a JSON list as `R`.
    pub fn wrap_all(&self, value: Value) -> Result<Vec<R>> {
        match value {
            Value::Array(items) => items.into_iter().map(|item| self.wrap(item)).collect(),
            other => Err(Error::unexpected(format!(
                "{} returned {} where a list was expected",
                self.url,
                kind_of(&other)
            ))),
        }
    }

    /// Every resource in the collection.
    pub async fn all(&self) -> Result<Vec<R>> {
        let json = self.request().get().await?;
        self.wrap_all(json)
    }

    /// Fetch by id. A missing resource is a 404 [`Error::Request`].
    pub async fn get(&self, id: impl fmt::Display) -> Result<R> {
        let json = self.request().key(id.to_string()).get().await?;
        self.wrap(json)
    }

    /// Fetch the single resource matching `filters`.
    ///
    /// `Ok(None)` when nothing matches, [`Error::AmbiguousQuery`] when more
    /// than one does.
    pub async fn get_by(&self, filters: Filters<'_>) -> Result<Option<R>> {
        let mut found = self.filter(filters).await?;
        match found.len() {
            0 => Ok(None),
            1 => Ok(found.pop()),
            count => Err(Error::AmbiguousQuery { count }),
        }
    }

    /// Every resource matching `filters`. At least one constraint is
    /// required.
    pub async fn filter(&self, filters: Filters<'_>) -> Result<Vec<R>> {
        if filters.is_empty() {
            return Err(Error::usage(
                "filter() must be given at least one constraint. Perhaps use all() instead.",
            ));
        }
        let params = self.filter_style.build(filters)?;
        debug!("{}: filter {:?}", self.url, params);

        let json = self
            .request()
            .key(self.filter_key.unwrap_or_default())
            .filters(params)
            .get()
            .await?;
        self.wrap_all(json)
    }

    pub async fn create(&self, body: Value) -> Result<Created<R>> {
        self.create_with(body, Vec::new()).await
    }

    /// POST `body` to the collection with extra query parameters.
    pub async fn create_with(&self, body: Value, params: Params) -> Result<Created<R>> {
        let resp = self.request().filters(params).post_json(&body).await?;
        match resp {
            Response::Json(Value::Array(items)) => Ok(Created::Many(
                items
                    .into_iter()
                    .map(|item| self.wrap(item))
                    .collect::<Result<_>>()?,
            )),
            Response::Json(json) => self.wrap(json).map(Created::One),
            _ => Err(Error::unexpected(format!(
                "{} returned no body for create",
                self.url
            ))),
        }
    }

    /// Number of resources in the collection.
    pub async fn count(&self) -> Result<u64> {
        match self.count_style {
            CountStyle::Total => self.request().get_count().await,
            CountStyle::ClientSide => Ok(self.all().await?.len() as u64),
            CountStyle::Unsupported => Err(Error::unsupported(R::schema().name, "count")),
        }
    }
}

impl<R: Resource> Clone for Endpoint<R> {
    fn clone(&self) -> Self {
        Self {
            ctx: self.ctx.clone(),
            url: self.url.clone(),
            filter_style: self.filter_style,
            filter_key: self.filter_key,
            count_style: self.count_style,
            _resource: PhantomData,
        }
    }
}

impl<R: Resource> fmt::Debug for Endpoint<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("resource", &R::schema().name)
            .field("url", &self.url)
            .field("filter_style", &self.filter_style)
            .field("count_style", &self.count_style)
            .finish()
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::firemon::record::{Schema, UrlScope, resource};
    use crate::firemon::testing::{self, FakeTransport, json_response, query_value};

    static WIDGET: Schema = Schema {
        name: "widget",
        path: Some("widget"),
        scope: UrlScope::Domain,
        ..Schema::GENERIC
    };

    resource!(Widget, WIDGET);

    const URL: &str = "https://fm.test/securitymanager/api/domain/1/widget";

    fn page(items: Value) -> Value {
        let total = items.as_array().map_or(0, Vec::len);
        json!({"total": total, "count": total, "page": 0, "pageSize": 100, "results": items})
    }

    fn endpoint(transport: &std::sync::Arc<FakeTransport>) -> Endpoint<Widget> {
        Endpoint::new(&testing::context(transport))
    }

    #[tokio::test]
    async fn all_wraps_each_item() {
        let transport = FakeTransport::new();
        transport.push_json(200, page(json!([{"id": 1, "name": "a"}, {"id": 2, "name": "b"}])));

        let widgets = endpoint(&transport).all().await.unwrap();
        assert_eq!(widgets.len(), 2);
        assert_eq!(widgets[1].get_str("name"), Some("b"));
        assert_eq!(widgets[1].url(), Some(format!("{URL}/2").as_str()));
        assert_eq!(transport.calls()[0].url, URL);
    }

    #[tokio::test]
    async fn get_by_id_surfaces_not_found() {
        let transport = FakeTransport::new();
        transport.push_json(200, json!({"id": 5, "name": "five"}));
        transport.push_bytes(404, b"");
        let ep = endpoint(&transport);

        assert_eq!(ep.get(5).await.unwrap().to_string(), "five");
        let err = ep.get(6).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(transport.calls()[1].url, format!("{URL}/6"));
    }

    #[tokio::test]
    async fn ambiguous_get_versus_filter() {
        let transport = FakeTransport::new();
        transport.respond_with(|_| {
            Ok(json_response(
                200,
                &page(json!([{"id": 1, "vendor": "acme"}, {"id": 2, "vendor": "acme"}])),
            ))
        });
        let ep = endpoint(&transport);

        let err = ep.get_by(&[("vendor", "acme")]).await.unwrap_err();
        assert!(matches!(err, Error::AmbiguousQuery { count: 2 }));
        assert_eq!(ep.filter(&[("vendor", "acme")]).await.unwrap().len(), 2);
        assert_eq!(query_value(&transport.calls()[0], "vendor"), Some("acme"));
    }

    #[tokio::test]
    async fn get_by_without_match_is_none() {
        let transport = FakeTransport::new();
        transport.push_json(200, page(json!([])));
        transport.push_json(200, page(json!([{"id": 9}])));
        let ep = endpoint(&transport);

        assert!(ep.get_by(&[("name", "ghost")]).await.unwrap().is_none());
        let one = ep.get_by(&[("name", "nine")]).await.unwrap().unwrap();
        assert_eq!(one.id(), Some(&json!(9)));
    }

    #[tokio::test]
    async fn empty_filter_is_rejected_before_any_call() {
        let transport = FakeTransport::new();
        let ep = endpoint(&transport);
        assert!(matches!(ep.filter(&[]).await, Err(Error::Usage(_))));
        assert!(matches!(ep.get_by(&[]).await, Err(Error::Usage(_))));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn search_style_takes_one_constraint() {
        let transport = FakeTransport::new();
        let ep = Endpoint::<Widget>::new(&testing::context(&transport)).filter_style(FilterStyle::Search);
        let err = ep.filter(&[("name", "edge"), ("vendor", "acme")]).await.unwrap_err();
        assert!(matches!(err, Error::Usage(_)));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn filter_styles_shape_the_query() {
        let transport = FakeTransport::new();
        transport.respond_with(|_| Ok(json_response(200, &page(json!([])))));
        let ctx = testing::context(&transport);

        Endpoint::<Widget>::new(&ctx)
            .filter_style(FilterStyle::Search)
            .filter(&[("name", "edge")])
            .await
            .unwrap();
        Endpoint::<Widget>::new(&ctx)
            .filter_style(FilterStyle::FilterParam)
            .filter_key("filter")
            .filter(&[("mgmtip", "10.0.0.1"), ("vendor", "acme")])
            .await
            .unwrap();
        Endpoint::<Widget>::new(&ctx)
            .filter_style(FilterStyle::Custom(|filters| {
                vec![("q".to_string(), format!("name = '{}'", filters[0].1))]
            }))
            .filter(&[("name", "core")])
            .await
            .unwrap();

        let calls = transport.calls();
        assert_eq!(query_value(&calls[0], "search"), Some("edge"));
        assert_eq!(calls[1].url, format!("{URL}/filter"));
        let filters: Vec<_> = calls[1]
            .query
            .iter()
            .filter(|(k, _)| k == "filter")
            .map(|(_, v)| v.as_str())
            .collect();
        assert_eq!(filters, vec!["mgmtip=10.0.0.1", "vendor=acme"]);
        assert_eq!(query_value(&calls[2], "q"), Some("name = 'core'"));
    }

    #[tokio::test]
    async fn create_returns_one_or_many() {
        let transport = FakeTransport::new();
        transport.push_json(200, json!({"id": 10, "name": "new"}));
        transport.push_json(200, json!([{"id": 11}, {"id": 12}]));
        let ep = endpoint(&transport);

        let one = ep.create(json!({"name": "new"})).await.unwrap().one().unwrap();
        assert_eq!(one.get_i64("id"), Some(10));
        let many = ep
            .create_with(json!([{}, {}]), vec![("bulk".into(), "true".into())])
            .await
            .unwrap();
        assert!(matches!(&many, Created::Many(v) if v.len() == 2));
        assert_eq!(query_value(&transport.calls()[1], "bulk"), Some("true"));
    }

    #[tokio::test]
    async fn count_styles() {
        let transport = FakeTransport::new();
        transport.push_json(200, json!({"total": 321, "results": []}));
        transport.push_json(200, page(json!([{"id": 1}, {"id": 2}, {"id": 3}])));
        let ep = endpoint(&transport);

        assert_eq!(ep.count().await.unwrap(), 321);
        assert_eq!(ep.clone().count_style(CountStyle::ClientSide).count().await.unwrap(), 3);
        let err = ep.count_style(CountStyle::Unsupported).count().await.unwrap_err();
        assert!(matches!(err, Error::Unsupported { operation: "count", .. }));
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test]
    async fn non_object_items_are_unexpected() {
        let transport = FakeTransport::new();
        transport.push_json(200, json!([1, 2]));
        let err = endpoint(&transport).all().await.unwrap_err();
        assert!(matches!(err, Error::UnexpectedResponse(_)));
    }
}
