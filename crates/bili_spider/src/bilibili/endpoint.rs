use reqwest::Url;

/// 各个接口的地址，基础地址可配置以便指向其它服务
#[derive(Debug, Clone)]
pub struct Endpoints {
    base: Url,
}

impl Endpoints {
    pub fn new(base: &str) -> Result<Self, url::ParseError> {
        Ok(Self { base: Url::parse(base)? })
    }

    pub fn account_info(&self, mid: u64) -> Url {
        self.build("/x/space/acc/info", &[("mid", mid.to_string())])
    }

    pub fn video_page(&self, mid: u64, page: u32) -> Url {
        self.build(
            "/x/space/arc/search",
            &[("mid", mid.to_string()), ("pn", page.to_string())],
        )
    }

    pub fn comment_page(&self, aid: i64, page: u32) -> Url {
        self.build(
            "/x/v2/reply",
            &[
                ("jsonp", "jsonp".to_owned()),
                ("pn", page.to_string()),
                ("type", "1".to_owned()),
                ("oid", aid.to_string()),
            ],
        )
    }

    pub fn reply_page(&self, aid: i64, root: i64, page: u32) -> Url {
        self.build(
            "/x/v2/reply/reply",
            &[
                ("jsonp", "jsonp".to_owned()),
                ("pn", page.to_string()),
                ("type", "1".to_owned()),
                ("oid", aid.to_string()),
                ("root", root.to_string()),
            ],
        )
    }

    /// 检查代理可用性时访问的地址
    pub fn proxy_probe(&self) -> Url {
        self.build("/x/v2/reply/main", &[])
    }

    fn build(&self, path: &str, query: &[(&str, String)]) -> Url {
        let mut url = self.base.clone();
        // 保留基础地址中的路径前缀
        let prefix = self.base.path().trim_end_matches('/');
        url.set_path(&format!("{prefix}{path}"));
        url.set_query(None);
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_urls() {
        let endpoints = Endpoints::new("https://api.bilibili.com").unwrap();
        assert_eq!(
            endpoints.account_info(42).as_str(),
            "https://api.bilibili.com/x/space/acc/info?mid=42"
        );
        assert_eq!(
            endpoints.video_page(42, 3).as_str(),
            "https://api.bilibili.com/x/space/arc/search?mid=42&pn=3"
        );
        assert_eq!(
            endpoints.comment_page(170001, 2).as_str(),
            "https://api.bilibili.com/x/v2/reply?jsonp=jsonp&pn=2&type=1&oid=170001"
        );
        assert_eq!(
            endpoints.reply_page(170001, 998, 1).as_str(),
            "https://api.bilibili.com/x/v2/reply/reply?jsonp=jsonp&pn=1&type=1&oid=170001&root=998"
        );
        assert_eq!(
            endpoints.proxy_probe().as_str(),
            "https://api.bilibili.com/x/v2/reply/main"
        );
    }

    #[test]
    fn test_endpoint_custom_base() {
        let endpoints = Endpoints::new("http://127.0.0.1:8080?x=1").unwrap();
        assert_eq!(
            endpoints.account_info(7).as_str(),
            "http://127.0.0.1:8080/x/space/acc/info?mid=7"
        );
        for base in ["http://127.0.0.1:8080/gateway", "http://127.0.0.1:8080/gateway/"] {
            let endpoints = Endpoints::new(base).unwrap();
            assert_eq!(
                endpoints.video_page(7, 1).as_str(),
                "http://127.0.0.1:8080/gateway/x/space/arc/search?mid=7&pn=1"
            );
            assert_eq!(
                endpoints.proxy_probe().as_str(),
                "http://127.0.0.1:8080/gateway/x/v2/reply/main"
            );
        }
        assert!(Endpoints::new("not a url").is_err());
    }
}
