pub(crate) const GET_DOMAIN_ALLOWLISTS: &str = r#"
query GetDomainAllowlists($filter: DomainAllowlistFilter) {
  domainAllowlists(filter: $filter) {
    id
    domain
    createdAt
    updatedAt
    createdBy {
      id
      email
      givenName
      surname
    }
  }
}
"#;

pub(crate) const GET_USERS: &str = r#"
query GetUsers($filter: UserFilterInput!, $workspaceId: ID!, $first: Int, $after: String) {
  users(filter: $filter, first: $first, after: $after) {
    edges {
      node {
        id
        email
        givenName
        surname
        profileImageUrl
        isOnboarded
        role(workspaceId: $workspaceId)
        inviteStatus(workspaceId: $workspaceId)
        lastLoginTs(workspaceId: $workspaceId)
      }
    }
    pageInfo {
      hasNextPage
      endCursor
    }
  }
}
"#;

pub(crate) const GET_ME: &str = r#"
query GetMe($lastWorkspaceId: ID) {
  me(lastWorkspaceId: $lastWorkspaceId) {
    id
    email
    givenName
    surname
    profileImageUrl
    isSuperuser
    workspaces {
      id
      name
      domain
    }
  }
}
"#;

pub(crate) const GET_WORKSPACES: &str = r#"
query GetWorkspaces($filter: WorkspaceFilter, $first: Int, $after: String) {
  workspaces(filter: $filter, first: $first, after: $after) {
    edges {
      node {
        id
        name
        domain
      }
    }
    pageInfo {
      hasNextPage
      endCursor
    }
  }
}
"#;

pub(crate) const GET_WORKSPACE_PREFERENCES: &str = r#"
query GetWorkspacePreferences($workspaceId: ID!) {
  workspacePreferences(workspaceId: $workspaceId) {
    id
    workspaceId
    preferences
    createTs
    updateTs
  }
}
"#;

pub(crate) const CREATE_DOMAIN_ALLOWLIST: &str = r#"
mutation CreateDomainAllowlist($input: CreateDomainAllowlistInput!) {
  createDomainAllowlist(input: $input) {
    domainAllowlist {
      id
      domain
      createdAt
      updatedAt
      createdBy {
        id
        email
        givenName
        surname
      }
    }
  }
}
"#;

pub(crate) const UPDATE_DOMAIN_ALLOWLIST: &str = r#"
mutation UpdateDomainAllowlist($input: UpdateDomainAllowlistInput!) {
  updateDomainAllowlist(input: $input) {
    domainAllowlist {
      id
      domain
      createdAt
      updatedAt
      createdBy {
        id
        email
        givenName
        surname
      }
    }
  }
}
"#;

pub(crate) const DELETE_DOMAIN_ALLOWLIST: &str = r#"
mutation DeleteDomainAllowlist($input: DeleteDomainAllowlistInput!) {
  deleteDomainAllowlist(input: $input) {
    success
  }
}
"#;

pub(crate) const INVITE_USER: &str = r#"
mutation InviteUser($input: InviteUserInput!) {
  inviteUser(input: $input) {
    user {
      id
      email
      givenName
      surname
      profileImageUrl
      isOnboarded
    }
  }
}
"#;

pub(crate) const UPDATE_USER: &str = r#"
mutation UpdateUser($input: UpdateUserInput!) {
  updateUser(input: $input) {
    user {
      id
      email
      givenName
      surname
      profileImageUrl
      isOnboarded
    }
  }
}
"#;

pub(crate) const DELETE_USER_ROLE: &str = r#"
mutation DeleteUserRole($input: DeleteUserRoleInput!) {
  deleteUserRole(input: $input) {
    success
    error
  }
}
"#;

pub(crate) const CREATE_WORKSPACE: &str = r#"
mutation CreateWorkspace($input: CreateWorkspaceInput!) {
  createWorkspace(input: $input) {
    success
    workspace {
      id
      name
      domain
    }
    error
  }
}
"#;

pub(crate) const UPDATE_WORKSPACE_PREFERENCES: &str = r#"
mutation UpdateWorkspacePreferences($input: UpdateWorkspacePreferencesInput!) {
  updatePreferences(input: $input) {
    preferences {
      id
      workspaceId
      preferences
      createTs
      updateTs
    }
  }
}
"#;
