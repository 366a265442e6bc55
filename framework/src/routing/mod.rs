mod macros;
mod router;

pub use macros::{
    __route_impl, validate_route_path, GroupDef, GroupRoute, HttpMethod, RouteDefBuilder,
};
pub use router::{
    register_route_name, route, BoxedHandler, MatchedRoute, RouteBuilder, RouteMiss, Router,
};
