use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use disclose_access::{policy, AccessType, CompanyMember, Role, TopicAccess, TopicGrant};
use disclose_core::{CompanyId, GrantId, MemberId, TopicId, UserId};

fn member(role: Role, access_type: AccessType) -> CompanyMember {
    CompanyMember {
        id: MemberId::new(),
        company_id: CompanyId::new(),
        user_id: UserId::new(),
        role,
        access_type,
        invited_by: None,
        invited_at: Utc::now(),
        created_at: Utc::now(),
    }
}

fn grant_row(member: &CompanyMember, can_view: bool, can_edit: bool) -> TopicAccess {
    TopicAccess {
        id: GrantId::new(),
        company_member_id: member.id,
        topic_id: TopicId::new(),
        can_view,
        can_edit,
        created_at: Utc::now(),
    }
}

/// Decision throughput across the role/scope/grant matrix; these functions
/// run once per topic when a report page renders, so they must stay cheap.
fn bench_decisions(c: &mut Criterion) {
    let cases: Vec<(CompanyMember, Option<TopicAccess>)> = {
        let mut cases = Vec::new();
        for role in [Role::Owner, Role::Admin, Role::Editor, Role::Viewer] {
            for access_type in [AccessType::All, AccessType::Selected] {
                let m = member(role, access_type);
                let row = grant_row(&m, true, role == Role::Editor);
                cases.push((m.clone(), None));
                cases.push((m, Some(row)));
            }
        }
        cases
    };

    c.bench_function("policy/can_view_topic_matrix", |b| {
        b.iter(|| {
            for (m, row) in &cases {
                black_box(policy::can_view_topic(black_box(m), row.as_ref()));
            }
        })
    });

    c.bench_function("policy/can_edit_topic_matrix", |b| {
        b.iter(|| {
            for (m, row) in &cases {
                black_box(policy::can_edit_topic(black_box(m), row.as_ref()));
            }
        })
    });
}

fn bench_grant_repair(c: &mut Criterion) {
    let pairs = [
        TopicGrant::new(false, false),
        TopicGrant::new(false, true),
        TopicGrant::new(true, false),
        TopicGrant::new(true, true),
    ];

    c.bench_function("policy/grant_normalization", |b| {
        b.iter(|| {
            for pair in pairs {
                black_box(black_box(pair).normalized());
            }
        })
    });
}

criterion_group!(benches, bench_decisions, bench_grant_repair);
criterion_main!(benches);
