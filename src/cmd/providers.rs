use streamfind::Config;

pub fn cmd_providers(config: &Config) {
    println!("📡 Providers ({} policy, priority order):\n", config.resolver.policy);

    for (i, spec) in config.providers.iter().enumerate() {
        let fetch = match spec.fetch {
            streamfind::FetchMode::Static => "static",
            streamfind::FetchMode::Rendered => "rendered",
        };
        println!("{:>3}. {} [{}] {fetch}", i + 1, spec.name, spec.lang);
        println!("       movie:  {}", spec.movie);
        println!("       series: {}", spec.series);
    }

    if config.aggregator.enabled {
        let agg = &config.aggregator;
        println!("{:>3}. {} [{}] api", config.providers.len() + 1, agg.label, agg.lang);
        println!("       base:   {}/{}", agg.base_url.trim_end_matches('/'), agg.route.trim_matches('/'));
        if agg.strict_episode_match {
            println!("       strict episode matching");
        }
    }
}
